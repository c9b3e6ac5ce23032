//! Resolution of the workflow inputs from arguments, falling back to asking
//! the user on the terminal.

use {
    crate::domain::{ContractName, ContractSource},
    std::{
        io,
        path::{Path, PathBuf},
    },
    thiserror::Error,
    url::Url,
};

/// Asks the user a question and returns the answer.
#[cfg_attr(test, mockall::automock)]
pub trait Prompt: Send + Sync {
    /// An empty answer yields `default` if one is given.
    fn ask(&self, question: &str, default: Option<String>) -> io::Result<String>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct Terminal;

impl Prompt for Terminal {
    fn ask(&self, question: &str, default: Option<String>) -> io::Result<String> {
        let mut input = dialoguer::Input::<String>::new().with_prompt(question);
        if let Some(default) = default {
            input = input.default(default);
        }
        input.interact_text().map_err(io::Error::other)
    }
}

pub const SOURCE_PATH_QUESTION: &str = "Enter path to contract source code";
pub const ENDPOINT_QUESTION: &str = "Enter web3 provider";

/// Returns the contract source read from `file`, given inline, or read from
/// a path the user is asked for, in that order.
pub async fn source(
    text: Option<String>,
    file: Option<&Path>,
    name: ContractName,
    prompt: &dyn Prompt,
) -> Result<ContractSource, Error> {
    let text = match (text, file) {
        (_, Some(file)) => read(file).await?,
        (Some(text), None) => text,
        (None, None) => {
            let path = prompt
                .ask(SOURCE_PATH_QUESTION, None)
                .map_err(Error::Prompt)?;
            let path = PathBuf::from(shellexpand::tilde(path.trim()).into_owned());
            read(&path).await?
        }
    };
    if text.trim().is_empty() {
        return Err(Error::EmptySource);
    }
    Ok(ContractSource { text, name })
}

async fn read(path: &Path) -> Result<String, Error> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| Error::Read {
            path: path.to_owned(),
            source,
        })
}

/// Returns the given endpoint or asks the user for one, offering `default`.
pub fn endpoint(given: Option<Url>, default: &Url, prompt: &dyn Prompt) -> Result<Url, Error> {
    if let Some(url) = given {
        return Ok(url);
    }
    let answer = prompt
        .ask(ENDPOINT_QUESTION, Some(default.to_string()))
        .map_err(Error::Prompt)?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(default.clone());
    }
    answer.parse().map_err(|source| Error::InvalidEndpoint {
        endpoint: answer.to_owned(),
        source,
    })
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read contract source {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to prompt for input: {0}")]
    Prompt(io::Error),
    #[error("contract source is empty")]
    EmptySource,
    #[error("invalid endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        source: url::ParseError,
    },
}

impl Error {
    /// Name of the failure class this error belongs to.
    pub fn kind(&self) -> &'static str {
        "InputError"
    }
}
