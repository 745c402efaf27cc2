//! Replays a session script and prints the resulting model.

use clap::Parser;
use drawit_app::{AppResult, Args, Script, Session, load_config};

fn run(args: Args) -> AppResult<()> {
    let config = args.config.as_deref().map(load_config).transpose()?;
    let script = Script::load(&args.script)?;

    let mut session = Session::from_script(&script, config)?;
    session.run(&script)?;
    log::info!(
        "Replayed {} actions, {} model changes",
        script.actions.len(),
        session.changes()
    );

    if args.render {
        for line in session.render()? {
            eprintln!("{line}");
        }
    }
    println!("{}", session.model().to_json()?);
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    log::info!("Starting DrawIt");

    if let Err(e) = run(args) {
        log::error!("{e}");
        eprintln!("drawit: {e}");
        std::process::exit(1);
    }
}
