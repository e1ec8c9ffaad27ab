//! Process module.
//!
//! This module contains a cross platform helper to run the shell
//! commands found in the configuration (the IMAP password command for
//! instance).

use log::debug;
use std::{
    env, io,
    process::{Command, Output},
    result, string,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot run command {1:?}")]
    RunCmdError(#[source] io::Error, String),
    #[error("command {0:?} exited with status {1}")]
    ExitStatusError(String, i32),
    #[error("cannot parse command output")]
    ParseCmdOutputError(#[source] string::FromUtf8Error),
}

pub type Result<T> = result::Result<T, Error>;

/// Runs the given command through the platform shell and returns
/// its standard output as an UTF-8 string.
pub fn run(cmd: &str) -> Result<String> {
    debug!("running command: {}", cmd);

    let output = shell(cmd).map_err(|err| Error::RunCmdError(err, cmd.to_owned()))?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        return Err(Error::ExitStatusError(cmd.to_owned(), code));
    }

    String::from_utf8(output.stdout).map_err(Error::ParseCmdOutputError)
}

fn shell(cmd: &str) -> io::Result<Output> {
    let windows = cfg!(target_os = "windows")
        && env::var("MSYSTEM")
            .map(|env| !env.starts_with("MINGW"))
            .unwrap_or_default();

    if windows {
        Command::new("cmd").args(["/C", cmd]).output()
    } else {
        Command::new("sh").arg("-c").arg(cmd).output()
    }
}
