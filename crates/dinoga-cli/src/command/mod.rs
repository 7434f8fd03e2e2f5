use clap::{Parser, Subcommand};

use self::{
    checkpoints::CheckpointsArg, demo::DemoArg, init_config::InitConfigArg, report::ReportArg,
    train::TrainArg,
};

mod checkpoints;
mod demo;
mod init_config;
mod report;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Evolve policies on the simulator
    Train(#[clap(flatten)] TrainArg),
    /// Play the best saved policy
    Demo(#[clap(flatten)] DemoArg),
    /// List saved checkpoints
    Checkpoints(#[clap(flatten)] CheckpointsArg),
    /// Summarize the training history of the latest checkpoint
    Report(#[clap(flatten)] ReportArg),
    /// Write a configuration file
    InitConfig(#[clap(flatten)] InitConfigArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::Demo(arg) => demo::run(&arg)?,
        Mode::Checkpoints(arg) => checkpoints::run(&arg)?,
        Mode::Report(arg) => report::run(&arg)?,
        Mode::InitConfig(arg) => init_config::run(&arg)?,
    }
    Ok(())
}
