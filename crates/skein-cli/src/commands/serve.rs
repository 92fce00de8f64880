use skein_server::ServerConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

pub fn run(bind: String, data: String, repo: String, port_attempts: u32) {
    let bind_addr: SocketAddr = bind.parse().unwrap_or_else(|e| {
        eprintln!("error: invalid --bind address `{bind}`: {e}");
        process::exit(1);
    });

    let config = ServerConfig {
        bind: bind_addr,
        data_path: PathBuf::from(&data),
        repo_hint: PathBuf::from(&repo),
        port_attempts,
    };

    println!("skein serve");
    println!("  bind: {bind_addr} (up to {port_attempts} port attempts)");
    println!("  data: {data}");
    println!("  channel: JSON lines; the client's first line opens the session");
    println!("  read:    GET / or GET /issues for the full snapshot");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });

    if let Err(e) = runtime.block_on(skein_server::run(config)) {
        eprintln!("error: server failed: {e}");
        process::exit(1);
    }
}
