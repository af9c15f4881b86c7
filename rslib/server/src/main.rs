use std::time::Duration;
use std::{env, process};

use studydesk::ai_generation::config::AiGenerationConfig;
use studydesk::error::{Result, StudyError};
use studydesk::log::set_global_logger;
use studydesk::proxy;
use studydesk::proxy::config::ProxyServerConfig;
use studydesk::proxy::ProxyState;
use tokio::net::TcpListener;
use tracing::info;

fn main() {
    let result = if env::args().nth(1).as_deref() == Some("--healthcheck") {
        healthcheck()
    } else {
        run()
    };
    if let Err(err) = result {
        eprintln!("{err}");
        process::exit(1);
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let server = ProxyServerConfig::from_env()?;
    let ai = AiGenerationConfig::from_env()?;
    set_global_logger(server.log_file.as_deref())?;

    info!(
        provider = ai.provider.display_name(),
        route = %server.route,
        "starting completion proxy"
    );
    let state = ProxyState::from_config(&ai)?;
    let listener = TcpListener::bind(server.socket_addr()).await?;
    proxy::serve(listener, proxy::router(state, &server.route)).await
}

/// Exits non-zero unless the proxy on this host answers its preflight.
#[tokio::main(flavor = "current_thread")]
async fn healthcheck() -> Result<()> {
    let server = ProxyServerConfig::from_env()?;
    let url = format!("http://127.0.0.1:{}{}", server.port, server.route);
    let response = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?
        .request(reqwest::Method::OPTIONS, url)
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(StudyError::Upstream {
            status: response.status().as_u16(),
            message: "healthcheck failed".into(),
        });
    }
    Ok(())
}
