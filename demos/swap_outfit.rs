//! Outfit swap example - dresses a model photo in a garment photo.
//!
//! Run with: `cargo run --example swap_outfit -- <model.jpg> <garment.png>`
//!
//! Requires `GOOGLE_API_KEY` environment variable.

use luxefit::{GeminiSwapProvider, Slot, Studio, SubmitOutcome};
use std::sync::Arc;

#[tokio::main]
async fn main() -> luxefit::Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(model), Some(garment)) = (args.next(), args.next()) else {
        eprintln!("Usage: swap_outfit <model.jpg> <garment.png>");
        std::process::exit(2);
    };

    let provider = GeminiSwapProvider::builder().build()?;
    let studio = Studio::new(Arc::new(provider));

    studio.load_file(Slot::Model, &model).await?;
    studio.load_file(Slot::Garment, &garment).await?;

    match studio.submit().await {
        SubmitOutcome::Completed => {
            let saved = studio.save_result(".")?;
            println!("Outfit swap saved to {}", saved.display());
        }
        outcome => {
            let message = studio.failure_message().unwrap_or("nothing was submitted");
            eprintln!("{message} ({outcome:?})");
        }
    }

    Ok(())
}
