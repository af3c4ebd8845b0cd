use dotenvy::dotenv;
use tracing::{error, info};
use uuid::Uuid;

fn main() -> std::process::ExitCode {
    // Load .env early so CONFIG_PATH/RUST_LOG take effect, then bring the
    // subscriber up before anything can log. server::run() re-inits both;
    // try_init makes that a no-op.
    dotenv().ok();
    let cfg = configs::load_default().unwrap_or_default();
    common::utils::logging::init_logging(cfg.server.debug);

    let service_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new({
        move |info| {
            error!(
                service = "counterd",
                event = "panic",
                %service_id,
                pid,
                message = %info,
                "unhandled panic occurred"
            );
        }
    }));

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = cfg.server.worker_threads {
        builder.worker_threads(w);
    }

    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "counterd", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        service = "counterd",
        event = "start",
        %service_id,
        pid,
        version,
        "counter service starting"
    );

    match rt.block_on(server::run()) {
        Ok(()) => {
            info!(service = "counterd", event = "stop", %service_id, pid, "stopped normally");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            error!(service = "counterd", event = "run_failed", error = %e, "server::run returned error");
            std::process::ExitCode::FAILURE
        }
    }
}
