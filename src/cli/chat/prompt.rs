use std::path::PathBuf;

use rustyline::{Config, Editor, Result};

pub fn generate_prompt(model: &str) -> String {
    format!("[{model}] > ")
}

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .history_ignore_dups(true)
        .completion_type(rustyline::CompletionType::List)
        .build();
    Editor::with_config(config)
}

/// Where line-editing history is kept between runs.
pub fn history_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("lmchat").join("history.txt"))
}
