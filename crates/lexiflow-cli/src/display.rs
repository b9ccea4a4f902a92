//! Terminal rendering of streamed records

use colored::*;
use lexiflow_common::{Evaluation, FramePayload, ProductListing, VocabularyItem};
use serde_json::Value;
use std::io::{self, Write};

pub fn vocabulary_line(index: usize, item: &VocabularyItem) -> String {
    let mut line = format!(
        "{}. {} - {}",
        index.to_string().bright_yellow(),
        item.word.bright_green().bold(),
        item.meaning
    );
    if let Some(phonetic) = &item.phonetic {
        line.push_str(&format!(" {}", phonetic.bright_blue()));
    }
    if let Some(pos) = &item.part_of_speech {
        line.push_str(&format!(" ({})", pos.italic()));
    }
    if !item.example.is_empty() {
        line.push_str(&format!("\n   {}", item.example.dimmed()));
    }
    line
}

pub fn product_line(index: usize, product: &ProductListing) -> String {
    let price = match &product.price {
        Some(Value::Number(n)) => format!(" [{} VND]", n),
        Some(Value::String(s)) if !s.is_empty() => format!(" [{}]", s),
        _ => String::new(),
    };
    let mut line = format!(
        "{}. {}{} {}",
        index.to_string().bright_yellow(),
        product.name.bright_green().bold(),
        price.bright_magenta(),
        product.tags.join(", ").bright_blue()
    );
    if !product.description.is_empty() {
        line.push_str(&format!("\n   {}", product.description));
    }
    line
}

pub fn band_text(band: &Value) -> String {
    match band {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn print_evaluation(evaluation: &Evaluation) {
    println!(
        "{} {}",
        "Band:".bright_yellow(),
        band_text(&evaluation.band).bright_green().bold()
    );
    println!("{}", evaluation.feedback);
    if !evaluation.strengths.is_empty() {
        println!("{}", "Strengths:".bright_cyan());
        for strength in &evaluation.strengths {
            println!("  + {}", strength);
        }
    }
    if !evaluation.improvements.is_empty() {
        println!("{}", "Improvements:".bright_cyan());
        for improvement in &evaluation.improvements {
            println!("  - {}", improvement);
        }
    }
}

/// Text payloads under `answer` are printed inline as they arrive
pub fn print_payload(payload: &FramePayload) {
    match (payload.key.as_str(), payload.text()) {
        ("answer", Some(text)) => {
            print!("{}", text);
            let _ = io::stdout().flush();
        }
        (key, Some(text)) => println!("\n{} {}", format!("[{}]", key).bright_blue(), text),
        (key, None) => println!("\n{} {}", format!("[{}]", key).bright_blue(), payload.content),
    }
}
