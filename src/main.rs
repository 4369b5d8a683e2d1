use app_shell::authentication::{AuthenticationApp, PlatformContext};
use app_shell::clients::AuthenticationClient;
use app_shell::lifecycle::{setup_tracing, HostedApplication, ShellConfig};
use tracing::{info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = ShellConfig::from_args(&args).map_err(|e| e.to_string())?;
    info!(?config, "Starting authentication application");

    let platform = PlatformContext::new("demo-device")
        .with_account("alice@example.com")
        .with_account("bob@example.com");
    let app = HostedApplication::start(
        AuthenticationApp::new(platform),
        config,
        "shell://demo",
        "app://authentication",
        args,
    );

    let span = tracing::info_span!("auth_session", requestor = "app://mail");
    async {
        let connection = app
            .client
            .connect("app://mail")
            .await
            .map_err(|e| e.to_string())?;
        let mut auth = AuthenticationClient::connect(&app.client, connection)
            .await
            .map_err(|e| e.to_string())?;

        let username = auth
            .select_account(true)
            .await
            .map_err(|e| e.to_string())?;
        info!(%username, "Account selected");

        let token = auth
            .get_oauth2_token(&username, &["email", "profile"])
            .await
            .map_err(|e| e.to_string())?;
        info!(%token, "Token issued");

        auth.clear_oauth2_token(&token)
            .await
            .map_err(|e| e.to_string())?;

        let info = app
            .client
            .describe(connection)
            .await
            .map_err(|e| e.to_string())?;
        info!(?info, "Connection state");
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    app.shutdown().await.map_err(|e| e.to_string())?;
    info!("Done");
    Ok(())
}
