use std::borrow::Cow;
use std::iter;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use wdb_core::config::{SessionConfig, Verbosity};
use wdb_core::events::{DebuggerEvent, DebuggerEventReceiver};
use wdb_core::types::{ProcessId, RegisterValue, WaitStatus};
use wdb_core::{create_debugger, Debugger, Result as DebuggerResult};
use wdb_utils::{info, init_logging_with, warn, LogFormat, LogLevel, LoggingOptions};

/// Exit status used when the debugger killed the target.
const EXIT_KILLED: i32 = 137;

/// Native Windows debugger: run or attach to a process and report its stops.
#[derive(Parser, Debug)]
#[command(name = "wdb")]
#[command(version)]
#[command(about = "Native Windows debugger: run or attach to a process and report its stops", long_about = None)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,

    /// Diagnostic streams to raise to info level (exec,events,memory,exceptions|all|none).
    /// Defaults to WDB_DEBUG.
    #[arg(long, global = true, value_name = "LIST")]
    debug: Option<Verbosity>,

    /// Maximum log level; overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log output format (pretty or json); overrides WDB_LOG_FORMAT
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Kill the target after this many stops (0 = never)
    #[arg(long, global = true, default_value_t = 0)]
    max_stops: usize,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Launch a program under debugger control
    Launch
    {
        /// Path to the executable
        program: String,
        /// Give the program its own console window
        #[arg(long, default_value_t = false)]
        new_console: bool,
        /// Start the program in a new process group (Ctrl-Break interrupts only it)
        #[arg(long, default_value_t = false)]
        new_group: bool,
        /// Arguments passed to the program
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Attach to a running process by PID
    Attach
    {
        /// Process ID to attach to
        pid: u32,
    },
}

fn main()
{
    let cli = Cli::parse();

    let options = match LoggingOptions::from_env() {
        Ok(options) => options.with_level(cli.log_level).with_format(cli.log_format),
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };
    let _guard = match init_logging_with(options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    // Ctrl-C reaches the target through the shared console and comes back as
    // a SIGINT stop; the debugger itself must survive it.
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        warn!("could not install Ctrl-C handler: {e}");
    }

    match run_command(cli, &interrupted) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run_command(cli: Cli, interrupted: &AtomicBool) -> DebuggerResult<i32>
{
    let mut config = SessionConfig::from_env();
    if let Some(verbosity) = cli.debug {
        config.verbosity = verbosity;
    }

    match cli.command {
        Commands::Launch {
            program,
            new_console,
            new_group,
            args,
        } => {
            config.new_console = new_console;
            config.new_process_group = new_group;
            let mut debugger = create_debugger(config)?;
            let events = debugger.subscribe();

            let args = join_args(&args);
            let env: Vec<(String, String)> = std::env::vars_os()
                .map(|(name, value)| (name.to_string_lossy().into_owned(), value.to_string_lossy().into_owned()))
                .collect();
            info!("Launching {program} {args}");
            let pid = debugger.launch(&program, &args, &env)?;
            println!("Started process {pid}");
            drain(&events);

            run_target(debugger.as_mut(), &events, cli.max_stops, interrupted)
        }
        Commands::Attach { pid } => {
            let mut debugger = create_debugger(config)?;
            let events = debugger.subscribe();
            debugger.attach(ProcessId::from(pid))?;
            println!("{}", debugger.files_info()?);

            run_target(debugger.as_mut(), &events, cli.max_stops, interrupted)
        }
    }
}

/// Headless stop/continue loop. Returns the exit status for the CLI.
fn run_target(
    debugger: &mut dyn Debugger,
    events: &DebuggerEventReceiver,
    max_stops: usize,
    interrupted: &AtomicBool,
) -> DebuggerResult<i32>
{
    let pc = debugger.register_layout().pc;
    let mut stops = 0usize;

    loop {
        match debugger.wait()? {
            WaitStatus::Exited { code } => {
                drain(events);
                println!("[process exited with code {code:#x}]");
                debugger.mourn()?;
                return Ok(code as i32);
            }
            WaitStatus::Stopped { .. } => {
                stops += 1;
                drain(events);
                println!("{}", stop_line(debugger.fetch_register(pc)));

                let limit_reached = max_stops != 0 && stops >= max_stops;
                if interrupted.swap(false, Ordering::SeqCst) || limit_reached {
                    println!("Killing process {}", debugger.process_id().map_or(0, ProcessId::raw));
                    debugger.kill()?;
                    return Ok(EXIT_KILLED);
                }
                debugger.resume(false, None)?;
            }
        }
    }
}

/// One-line stop report. A stop whose registers cannot be read is still
/// reported, just without the pc.
fn stop_line(pc: DebuggerResult<RegisterValue>) -> String
{
    match pc {
        Ok(value) => format!("  stopped at {:#x}", value.as_u64()),
        Err(e) => {
            warn!("pc unavailable: {e}");
            "  stopped (pc unavailable)".to_string()
        }
    }
}

/// Print what the controller reported since the last call.
fn drain(events: &DebuggerEventReceiver)
{
    for event in events.try_iter() {
        match event {
            DebuggerEvent::TargetStopped { .. } | DebuggerEvent::DebugOutput { .. } => println!("{}", event.describe()),
            DebuggerEvent::ModuleLoaded { .. } | DebuggerEvent::TargetExited { .. } | DebuggerEvent::TargetResumed { .. } => {}
        }
    }
}

/// Join arguments into one command-line tail, quoting where the target's
/// argument parser would otherwise split or strip.
fn join_args(args: &[String]) -> String
{
    args.iter().map(|arg| quote_arg(arg)).collect::<Vec<_>>().join(" ")
}

fn quote_arg(arg: &str) -> Cow<'_, str>
{
    if !arg.is_empty() && !arg.contains([' ', '\t', '"']) {
        return Cow::Borrowed(arg);
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    let mut backslashes = 0;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                quoted.extend(iter::repeat('\\').take(backslashes * 2 + 1));
                quoted.push('"');
                backslashes = 0;
            }
            _ => {
                quoted.extend(iter::repeat('\\').take(backslashes));
                quoted.push(c);
                backslashes = 0;
            }
        }
    }
    quoted.extend(iter::repeat('\\').take(backslashes * 2));
    quoted.push('"');
    Cow::Owned(quoted)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_plain_arguments_are_unchanged()
    {
        assert_eq!(join_args(&["-v".to_string(), r"C:\dir\file.txt".to_string()]), r"-v C:\dir\file.txt");
    }

    #[test]
    fn test_arguments_with_spaces_and_quotes()
    {
        assert_eq!(quote_arg("two words"), r#""two words""#);
        assert_eq!(quote_arg(""), r#""""#);
        assert_eq!(quote_arg(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(quote_arg(r"C:\my dir\"), r#""C:\my dir\\""#);
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand()
    {
        let cli = Cli::parse_from(["wdb", "launch", "--new-group", "app.exe", "a", "b c"]);
        match cli.command {
            Commands::Launch { program, new_group, args, .. } => {
                assert_eq!(program, "app.exe");
                assert!(new_group);
                assert_eq!(args, vec!["a".to_string(), "b c".to_string()]);
            }
            Commands::Attach { .. } => panic!("expected launch"),
        }

        let cli = Cli::parse_from(["wdb", "--debug", "events,memory", "--max-stops", "3", "attach", "42"]);
        let verbosity = cli.debug.unwrap();
        assert!(verbosity.events && verbosity.memory && !verbosity.exec);
        assert_eq!(cli.max_stops, 3);
        assert!(matches!(cli.command, Commands::Attach { pid: 42 }));
    }

    #[test]
    fn test_stop_without_registers_is_still_reported()
    {
        assert_eq!(stop_line(Ok(RegisterValue::from_u64(0x1_4000_1000, 8))), "  stopped at 0x140001000");
        assert_eq!(stop_line(Err(wdb_core::WdbError::NotAttached)), "  stopped (pc unavailable)");
    }
}
