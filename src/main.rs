use futures::TryStreamExt;
use kv_storage_area::config::{ApiConfig, CredentialSource};
use kv_storage_area::storage::{Expiry, ListOptions, StorageArea, ValueType};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn usage(program: &str) {
    eprintln!(
        "Usage: {} --name <area> [--key-file <path>] [--base-url <url>] [--limit <n>] <command> [args]",
        program
    );
    eprintln!("Commands:");
    eprintln!("  get <key>");
    eprintln!("  set <key> <value> [--ttl <seconds> | --exp <epoch>]");
    eprintln!("  delete <key>");
    eprintln!("  clear");
    eprintln!("  keys");
    eprintln!("  entries");
    eprintln!("Example: {} --name sessions set user:1 alice --ttl 3600", program);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut name: Option<String> = None;
    let mut key_file: Option<PathBuf> = None;
    let mut base_url: Option<String> = None;
    let mut limit: Option<u32> = None;
    let mut expiry: Option<Expiry> = None;
    let mut positional: Vec<String> = vec![];

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--name", Some(v)) => {
                name = Some(v.clone());
                i += 2;
            }
            ("--key-file", Some(v)) => {
                key_file = Some(PathBuf::from(v));
                i += 2;
            }
            ("--base-url", Some(v)) => {
                base_url = Some(v.clone());
                i += 2;
            }
            ("--limit", Some(v)) => {
                limit = Some(v.parse()?);
                i += 2;
            }
            ("--ttl", Some(v)) => {
                expiry = Some(Expiry::Ttl(v.parse()?));
                i += 2;
            }
            ("--exp", Some(v)) => {
                expiry = Some(Expiry::At(v.parse()?));
                i += 2;
            }
            _ => {
                positional.push(args[i].clone());
                i += 1;
            }
        }
    }

    let (Some(name), Some(command)) = (name, positional.first().cloned()) else {
        usage(&args[0]);
        std::process::exit(1);
    };

    let source = match key_file {
        Some(path) => CredentialSource::KeyFile(path),
        None => CredentialSource::Discover,
    };
    let mut config = ApiConfig::discover(&source)?;
    if let Some(base_url) = base_url {
        config = config.with_base_url(&base_url);
    }

    tracing::info!("Using storage area '{}' on account {}", name, config.credentials.id);
    let area = StorageArea::new(&name, config);

    let arg = |n: usize| {
        positional
            .get(n)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("'{}' expects more arguments", command))
    };
    let options = ListOptions { limit, ..Default::default() };

    match command.as_str() {
        "get" => match area.get(&arg(1)?, ValueType::Text).await? {
            Some(value) => println!("{}", value.as_text().unwrap_or_default()),
            None => {
                eprintln!("(not found)");
                std::process::exit(2);
            }
        },
        "set" => {
            area.set(&arg(1)?, Some(arg(2)?.into()), expiry).await?;
        }
        "delete" => {
            area.delete(&arg(1)?).await?;
        }
        "clear" => {
            area.clear().await?;
        }
        "keys" => {
            let mut keys = area.keys(options).await?.into_stream();
            while let Some(key) = keys.try_next().await? {
                println!("{}", key);
            }
        }
        "entries" => {
            let mut entries = area.entries(options).await?.into_stream();
            while let Some((key, value)) = entries.try_next().await? {
                let text = value.as_ref().and_then(|v| v.as_text()).unwrap_or("");
                println!("{}\t{}", key, text);
            }
        }
        other => {
            eprintln!("Unknown command: {}", other);
            usage(&args[0]);
            std::process::exit(1);
        }
    }

    Ok(())
}
