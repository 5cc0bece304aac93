//! LLM Council - ask several models at once, get one synthesized answer

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use llm_council::llm::MemberResponse;
use llm_council::{Config, Council, ConversationStore, CouncilOutcome, Message};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Question to put to the council
    #[arg(short, long)]
    prompt: Option<String>,

    /// Continue a stored conversation
    #[arg(long)]
    conversation: Option<String>,

    /// List stored conversations and exit
    #[arg(long, default_value_t = false)]
    list: bool,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    dotenv::dotenv().ok();

    // Initialize logging
    let filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let config = Config::load(args.config.as_deref())?.with_env_overrides()?;
    config.validate()?;

    let store = ConversationStore::new(&config.storage.data_dir);

    if args.list {
        for meta in store.list()? {
            println!(
                "{}  {}  {} ({} messages)",
                meta.id,
                meta.created_at.format("%Y-%m-%d %H:%M"),
                meta.title,
                meta.message_count
            );
        }
        return Ok(());
    }

    let prompt = args
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| anyhow!("No prompt given. Use --prompt \"your question\"."))?;

    let mut conversation = match &args.conversation {
        Some(id) => store
            .get(id)?
            .ok_or_else(|| anyhow!("Conversation {} not found", id))?,
        None => store.create(),
    };

    let council = Council::from_config(&config)?;
    info!(
        members = ?council.members(),
        chairman = council.chairman(),
        "Convening council"
    );

    let mut messages = conversation.history();
    messages.push(Message::user(prompt.as_str()));

    // members are printed before synthesis so a chairman failure doesn't hide them
    let responses = council.collect_responses(&messages).await;
    print_responses(&responses);
    let synthesis = council.synthesize(&prompt, &responses).await?;
    println!("=== Chairman ({}) ===\n{}", synthesis.model, synthesis.content);

    // only completed rounds are persisted
    conversation.add_user_message(prompt);
    conversation.add_assistant_message(CouncilOutcome {
        responses,
        synthesis,
    });
    store.save(&conversation)?;
    eprintln!("Conversation: {}", conversation.id);

    Ok(())
}

fn print_responses(responses: &[MemberResponse]) {
    for response in responses {
        println!("=== {} ===\n{}\n", response.model, response.content);
    }
}
