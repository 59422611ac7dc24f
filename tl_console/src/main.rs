//! Line-up arrangement console for tournament administrators.
//!
//! The console talks to the arrangement service over HTTP (or to an in-memory
//! demo gateway with `--offline`), and drives one arrangement store from
//! commands typed at the prompt.

use anyhow::{Context, Result};
use log::info;
use pico_args::Arguments;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tourney_lineup::arrangement::{
    Arrangement, ArrangementStore, AssignableItem, ContentItem, ContentType, Gender, Section,
    TeamMember,
};
use tourney_lineup::gateway::{ArrangementGateway, MemoryGateway};

use tl_console::api_client::ArrangementApiClient;
use tl_console::commands::{ConsoleCommand, parse_command};
use tl_console::config::{ConfigOverrides, ConsoleConfig};
use tl_console::session::{Reply, Session};

const HELP: &str = "\
Arrange competitors into tournament line-ups

USAGE:
  tl_console [OPTIONS]

OPTIONS:
  --server URL             Arrangement service URL  [env: LINEUP_API_URL, default: http://localhost:8080]
  --token TOKEN            Bearer token             [env: LINEUP_API_TOKEN]
  --timeout SECS           Request timeout          [env: LINEUP_TIMEOUT_SECS, default: 10]
  --competition ID         Competition to load      [env: LINEUP_COMPETITION_ID]
  --content-type TYPE      quyen or music           [env: LINEUP_CONTENT_TYPE, default: quyen]
  --policy POLICY          latest or last-resolved  [env: LINEUP_RESPONSE_POLICY, default: latest]

FLAGS:
  --offline                Use built-in demo data instead of the service
  -h, --help               Print help information
";

struct Args {
    overrides: ConfigOverrides,
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_target(false)
        .init();

    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        overrides: ConfigOverrides {
            api_url: pargs.opt_value_from_str("--server")?,
            api_token: pargs.opt_value_from_str("--token")?,
            timeout_secs: pargs.opt_value_from_str("--timeout")?,
            competition_id: pargs.opt_value_from_str("--competition")?,
            content_type: pargs.opt_value_from_str("--content-type")?,
            response_policy: pargs.opt_value_from_str("--policy")?,
        },
        offline: pargs.contains("--offline"),
    };

    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let mut config = ConsoleConfig::from_env(args.overrides).context("Invalid configuration")?;

    let gateway: Arc<dyn ArrangementGateway> = if args.offline {
        println!("Offline mode: using demo competition 'demo'");
        if config.competition_id.is_none() {
            config.competition_id = Some("demo".to_string());
        }
        Arc::new(demo_gateway())
    } else {
        info!("Using arrangement service at {}", config.api_url);
        Arc::new(
            ArrangementApiClient::with_timeout(config.api_url.clone(), config.timeout)
                .map_err(|e| anyhow::anyhow!(e.client_message()))?
                .with_access_token(config.api_token.clone()),
        )
    };

    let store = ArrangementStore::new(gateway).with_policy(config.response_policy);
    store.set_content_type(config.content_type);
    store.set_competition_id(config.competition_id.clone());
    let session = Session::new(store);

    if config.competition_id.is_some() {
        print_reply(&session.execute(ConsoleCommand::Load).await);
    } else {
        println!("No competition selected. Use 'competition ID' to pick one.");
    }
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(command) => match session.execute(command).await {
                Reply::Quit => break,
                reply => print_reply(&reply),
            },
            Err(e) => println!("{}", e),
        }
    }

    Ok(())
}

fn print_reply(reply: &Reply) {
    if let Reply::Output(text) = reply {
        println!("{}", text.trim_end());
    }
}

/// In-memory gateway with a small forms and music competition
fn demo_gateway() -> MemoryGateway {
    let gateway = MemoryGateway::new();

    let athletes = [
        ("a1", "Nguyễn Văn An", Gender::Male, "HS-001", "Long Hổ Quyền"),
        ("a2", "Trần Thị Bình", Gender::Female, "HS-002", "Long Hổ Quyền"),
        ("a3", "Đỗ Minh Đức", Gender::Male, "HS-003", "Ngũ Môn Quyền"),
        ("a4", "Lê Thu Hà", Gender::Female, "HS-004", "Ngũ Môn Quyền"),
        ("a5", "Phạm Quốc Bảo", Gender::Male, "HS-005", "Long Hổ Quyền"),
    ];
    let pool = athletes
        .iter()
        .map(|(id, name, gender, code, form)| {
            let content = if form.starts_with("Long") { "q1" } else { "q2" };
            AssignableItem::athlete(*id, *name, *gender, content)
                .with_student_code(*code)
                .with_form_label(*form)
        })
        .collect();

    gateway.set_arrangement(
        "demo",
        ContentType::Quyen,
        Arrangement {
            pool,
            sections: vec![
                Section::new("q1", "Long Ho Quyen"),
                Section::new("q2", "Ngu Mon Quyen"),
            ],
        },
    );
    gateway.set_catalog(
        "demo",
        ContentType::Quyen,
        vec![
            ContentItem {
                id: "q1".to_string(),
                name: "Long Hổ Quyền".to_string(),
            },
            ContentItem {
                id: "q2".to_string(),
                name: "Ngũ Môn Quyền".to_string(),
            },
        ],
    );

    let member = |name: &str, gender: Gender, code: &str| TeamMember {
        name: name.to_string(),
        gender,
        student_code: code.to_string(),
        form_label: None,
    };
    gateway.set_arrangement(
        "demo",
        ContentType::Music,
        Arrangement {
            pool: vec![
                AssignableItem::team(
                    "t1",
                    "Đội Hà Nội",
                    Gender::Mixed,
                    "m1",
                    vec![
                        member("Nguyễn Văn An", Gender::Male, "HS-001"),
                        member("Lê Thu Hà", Gender::Female, "HS-004"),
                    ],
                ),
                AssignableItem::team(
                    "t2",
                    "Đội Huế",
                    Gender::Mixed,
                    "m1",
                    vec![member("Trần Thị Bình", Gender::Female, "HS-002")],
                ),
            ],
            sections: vec![Section::new("m1", "Music group")],
        },
    );

    gateway
}
