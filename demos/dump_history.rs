// Dump recent Auditoria_TamanoBD rows as JSON.
//
// Usage: cargo run --example dump_history -- [DB_PATH] [LIMIT] [SERVER]
//   DB_PATH  default: ./data/audit.db
//   LIMIT    default: 20
//   SERVER   optional server alias filter

use dbsize_monitor::history_repo::HistoryRepo;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let path = args.get(1).map(String::as_str).unwrap_or("./data/audit.db");
    let limit: u32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(20);
    let server = args.get(3).map(String::as_str);

    let repo = HistoryRepo::connect(path, 1).await?;
    let snapshots = repo.get_recent_snapshots(server, limit).await?;

    println!("{}", serde_json::to_string_pretty(&snapshots)?);
    Ok(())
}
