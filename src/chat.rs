use std::io::Write;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use rag_chat::application::AskOptions;
use rag_chat::client::{ChatClient, DEFAULT_BASE_URL};
use rag_chat::infrastructure::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "chat")]
#[command(about = "Talk to the RAG chatbot API from the terminal")]
struct Args {
    /// API base URL
    #[arg(long, env = "RAGCHAT_API_URL", default_value = DEFAULT_BASE_URL)]
    url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Ask without conversation history
    #[arg(long)]
    no_history: bool,

    /// Keep recording turns even with --no-history
    #[arg(long)]
    record_history: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("chat=warn,rag_chat=warn");

    let args = Args::parse();
    let client = ChatClient::new(&args.url, Duration::from_secs(args.timeout))?;
    let use_history = !args.no_history;
    let options = AskOptions {
        use_history,
        record_turn: use_history || args.record_history,
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "Connected to {} (history {})",
        client.base_url(),
        if use_history { "on" } else { "off" }
    );
    println!("Type a message, /history, /clear, or quit.");

    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "quit" | "exit" => break,
            "/clear" => match client.clear_history().await {
                Ok(reply) => println!("{}", reply.message),
                Err(e) => println!("Error: {e}"),
            },
            "/history" => match client.history().await {
                Ok(reply) if reply.total_turns == 0 => println!("(no history)"),
                Ok(reply) => {
                    for (question, answer) in reply.history {
                        println!("You: {question}\nAssistant: {answer}");
                    }
                }
                Err(e) => println!("Error: {e}"),
            },
            message => match client.chat(message, options).await {
                Ok(reply) if reply.success => println!(
                    "Assistant: {}\n  ({} sources, {:.2}s)",
                    reply.answer, reply.sources_count, reply.response_time
                ),
                Ok(reply) => println!("Assistant: {}", reply.answer),
                Err(e) => println!("Error: {e}"),
            },
        }
    }

    Ok(())
}
