//! Server command implementation

use anyhow::Result;

use finoly_core::ai::{AIBackend, AIClient};
use finoly_core::AIConfig;
use finoly_server::{ServerConfig, ALLOWED_ORIGINS_ENV};

pub async fn cmd_serve(host: &str, port: u16) -> Result<()> {
    println!("🚀 Starting Finoly web server...");
    println!("   Listening: http://{}:{}", host, port);

    let config = ServerConfig::from_env();
    if config.allowed_origins.is_empty() {
        println!("   🌐 CORS: any origin (set {} to restrict)", ALLOWED_ORIGINS_ENV);
    } else {
        println!("   🌐 CORS: {}", config.allowed_origins.join(", "));
    }

    let ai = AIConfig::from_env().map(|c| AIClient::from_config(&c));
    match ai {
        Some(ref client) => println!("   🤖 AI backend: {} ({})", client.host(), client.model()),
        None => {
            println!();
            println!("   ⚠️  No AI backend configured - /api/expense-tracker will answer 500");
            println!("      Set GROQ_API_KEY, or AI_BACKEND=ollama|openai_compatible|mock");
        }
    }
    println!();

    finoly_server::serve_with_config(host, port, config, ai).await
}
