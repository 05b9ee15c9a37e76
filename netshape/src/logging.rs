use std::io::Write;

use env_logger::Env;

/// Installs the compact `[crate] message` logger. Defaults to `info`,
/// `RUST_LOG` overrides it. Repeated calls are ignored.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let module_path = record.module_path().unwrap_or("unknown");
            let crate_name = module_path.split("::").next().unwrap_or(module_path);
            writeln!(buf, "[{}] {}", crate_name, record.args())
        })
        .try_init();
}
