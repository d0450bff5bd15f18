//! Purpose: Hold top-level CLI command dispatch for `pgmcall`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every command parses the schema with the configured default CCSID.
//! Invariants: `echo` never leaves the process; it uses the loopback transport.

use super::*;

pub(super) fn dispatch_command(command: Command, config: &EngineConfig) -> Result<RunOutcome, Error> {
    let parser = config.parser()?;
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "pgmcall", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Describe { schema } => {
            let schema = read_schema(&schema, &parser)?;
            emit_json(schema_json(&schema));
            Ok(RunOutcome::ok())
        }
        Command::Bind { schema, input } => {
            let schema = read_schema(&schema, &parser)?;
            let input = read_input(&input)?;
            let slots = schema.bind(&input)?;
            emit_json(json!({ "slots": slots_json(&slots) }));
            Ok(RunOutcome::ok())
        }
        Command::Echo {
            schema,
            program,
            input,
        } => {
            let schema = read_schema(&schema, &parser)?;
            let input = read_input(&input)?;
            let path = ProgramPath::qualify(&config.library, &program)?;
            let output = invoke(&schema, &path, &LoopbackTransport::new(), &input)?;
            emit_json(json!({
                "program": path.as_str(),
                "output": output,
            }));
            Ok(RunOutcome::ok())
        }
    }
}
