mod charts;
mod client;
mod config;
mod dashboard;
mod error;
mod file_info;
mod format;
mod progress;
mod server;
mod table;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::path::Path;
use std::process;
use std::time::Duration;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

use crate::client::{CloudSyncClient, UploadSource};
use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::dashboard::Dashboard;
use crate::error::{Error, Result};
use crate::progress::{UploadProgress, PROGRESS_INTERVAL};

fn cli() -> App<'static, 'static> {
    App::new("cloudsync")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Browse, chart, upload and download files on a CloudSync server")
        .setting(AppSettings::VersionlessSubcommands)
        .arg(
            Arg::with_name("config")
                .long("config")
                .short("c")
                .value_name("FILE")
                .default_value(DEFAULT_CONFIG_FILE)
                .help("JSON config file"),
        )
        .arg(
            Arg::with_name("server")
                .long("server")
                .value_name("URL")
                .help("Sync server base URL, overrides the config file"),
        )
        .arg(
            Arg::with_name("cookie")
                .long("cookie")
                .value_name("COOKIE")
                .help("Session cookie, e.g. session=..., overrides the config file"),
        )
        .subcommand(SubCommand::with_name("dashboard").about("Show the file table and both charts (default)"))
        .subcommand(SubCommand::with_name("ls").about("Show the file table"))
        .subcommand(
            SubCommand::with_name("charts")
                .about("Show the file type and size charts")
                .arg(
                    Arg::with_name("json")
                        .long("json")
                        .help("Print Chart.js configs instead of text bars"),
                ),
        )
        .subcommand(
            SubCommand::with_name("upload")
                .about("Upload one file, then show the refreshed table")
                .arg(Arg::with_name("FILE").required(true).help("File to upload")),
        )
        .subcommand(
            SubCommand::with_name("download")
                .about("Download a file by id")
                .arg(Arg::with_name("ID").required(true).help("File id as shown by `ls`"))
                .arg(
                    Arg::with_name("output")
                        .long("output")
                        .short("o")
                        .value_name("DIR")
                        .default_value(".")
                        .help("Directory to save into"),
                ),
        )
        .subcommand(
            SubCommand::with_name("serve")
                .about("Serve the dashboard page locally")
                .arg(
                    Arg::with_name("listen")
                        .long("listen")
                        .value_name("ADDR")
                        .default_value("127.0.0.1:4918")
                        .help("Address to listen on"),
                ),
        )
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let matches = cli().get_matches();
    if let Err(e) = run(&matches).await {
        tracing::error!("{}", e);
        eprintln!("cloudsync: {}", e);
        process::exit(1);
    }
}

async fn run(matches: &ArgMatches<'_>) -> Result<()> {
    let config_path = Path::new(matches.value_of("config").unwrap_or(DEFAULT_CONFIG_FILE));
    let config = Config::load(config_path)?
        .with_overrides(matches.value_of("server"), matches.value_of("cookie"))?;
    let client = CloudSyncClient::new(config)?;

    match matches.subcommand() {
        ("ls", _) => {
            print!("{}", Dashboard::load(&client).await?.render_table());
        }
        ("charts", Some(sub)) => {
            let dashboard = Dashboard::load(&client).await?;
            if sub.is_present("json") {
                println!("{}", serde_json::to_string_pretty(&dashboard.chart_configs())?);
            } else {
                print!("{}", dashboard.render_charts());
            }
        }
        ("upload", Some(sub)) => {
            let path = Path::new(sub.value_of("FILE").unwrap_or_default());
            print!("{}", upload_and_refresh(&client, path, PROGRESS_INTERVAL).await?);
        }
        ("download", Some(sub)) => {
            let id = sub.value_of("ID").unwrap_or_default();
            let dir = Path::new(sub.value_of("output").unwrap_or("."));
            let saved = client.download(id, dir).await?;
            println!("Saved {}", saved.display());
        }
        ("serve", Some(sub)) => {
            let listen = sub.value_of("listen").unwrap_or("127.0.0.1:4918");
            let addr: SocketAddr = listen
                .parse()
                .map_err(|e| Error::Config(format!("invalid listen address {:?}: {}", listen, e)))?;
            server::serve(addr, client).await?;
        }
        _ => {
            print!("{}", Dashboard::load(&client).await?.render_text());
        }
    }
    Ok(())
}

/// Uploads `path` with a progress line, then returns the success message followed by the
/// refreshed table. A failed upload skips the refresh.
async fn upload_and_refresh(
    client: &CloudSyncClient,
    path: &Path,
    interval: Duration,
) -> Result<String> {
    let source = UploadSource::inspect(path).await?;
    let progress = UploadProgress::new(source.len);
    let reporter = progress.spawn_reporter(&source.file_name, interval);

    let result = client.upload(&source, &progress).await;
    reporter.finish().await;
    let receipt = result?;

    let mut out = match receipt.file_id {
        Some(id) => format!("Upload successful! ({} -> {})\n", source.file_name, id),
        None => format!("Upload successful! ({})\n", source.file_name),
    };
    out.push_str(&Dashboard::load(client).await?.render_table());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{json_response, spawn_api};
    use http::Method;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<(Method, String)>>>;

    async fn recording_api(upload_reply: serde_json::Value) -> (String, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let seen = log.clone();
        let api = spawn_api(move |req| {
            seen.lock().unwrap().push((req.method.clone(), req.path.clone()));
            if req.method == Method::POST {
                json_response(200, upload_reply.clone())
            } else {
                json_response(
                    200,
                    json!([{"id": "n1", "name": "new.txt", "mimeType": "text/plain", "size": "5"}]),
                )
            }
        })
        .await;
        (api, log)
    }

    fn client_for(api: &str) -> CloudSyncClient {
        let config = Config::default().with_overrides(Some(api), None).unwrap();
        CloudSyncClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn upload_posts_then_refreshes_listing() {
        let (api, log) = recording_api(json!({"status": "success", "fileId": "n1"})).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.txt");
        std::fs::write(&path, b"hello").unwrap();

        let out = upload_and_refresh(&client_for(&api), &path, Duration::from_millis(5))
            .await
            .unwrap();

        assert!(out.starts_with("Upload successful! (new.txt -> n1)\n"), "{}", out);
        assert!(out.contains("5 Bytes"), "{}", out);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                (Method::POST, "/api/sync/upload".to_string()),
                (Method::GET, "/api/files".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn failed_upload_skips_refresh() {
        let (api, log) = recording_api(json!({"error": "Drive quota exceeded"})).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.txt");
        std::fs::write(&path, b"hello").unwrap();

        let result = upload_and_refresh(&client_for(&api), &path, Duration::from_millis(5)).await;

        match result {
            Err(Error::Api(msg)) => assert_eq!(msg, "Drive quota exceeded"),
            other => panic!("expected api error, got {:?}", other),
        }
        assert_eq!(
            *log.lock().unwrap(),
            vec![(Method::POST, "/api/sync/upload".to_string())]
        );
    }

    #[tokio::test]
    async fn missing_file_sends_nothing() {
        let (api, log) = recording_api(json!({"status": "success"})).await;
        let dir = tempfile::tempdir().unwrap();

        let result =
            upload_and_refresh(&client_for(&api), &dir.path().join("gone.txt"), Duration::from_millis(5))
                .await;

        assert!(matches!(result, Err(Error::NoFileSelected(_))));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn parses_subcommands() {
        let m = cli()
            .get_matches_from_safe(vec!["cloudsync", "--server", "http://h:1", "upload", "a.txt"])
            .unwrap();
        assert_eq!(m.value_of("server"), Some("http://h:1"));
        assert_eq!(m.value_of("config"), Some(DEFAULT_CONFIG_FILE));
        let (name, sub) = m.subcommand();
        assert_eq!(name, "upload");
        assert_eq!(sub.unwrap().value_of("FILE"), Some("a.txt"));
    }

    #[test]
    fn upload_requires_a_file() {
        assert!(cli().get_matches_from_safe(vec!["cloudsync", "upload"]).is_err());
    }

    #[test]
    fn download_defaults_to_current_dir() {
        let m = cli()
            .get_matches_from_safe(vec!["cloudsync", "download", "abc"])
            .unwrap();
        let sub = m.subcommand_matches("download").unwrap();
        assert_eq!(sub.value_of("ID"), Some("abc"));
        assert_eq!(sub.value_of("output"), Some("."));
    }

    #[test]
    fn no_subcommand_means_dashboard() {
        let m = cli().get_matches_from_safe(vec!["cloudsync"]).unwrap();
        assert_eq!(m.subcommand_name(), None);
    }
}
