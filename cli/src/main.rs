mod highlighter;
mod lexer;

use std::borrow::Cow;
use std::io::BufRead;
use std::io::BufReader;
use std::path::PathBuf;

use blaze::{Error, Session, SessionOptions, VmOptions, render_error};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use reedline::{
    DefaultCompleter, DescriptionMode, EditCommand, Emacs, IdeMenu, KeyCode, KeyModifiers,
    Keybindings, MenuBuilder, Prompt, PromptEditMode, PromptHistorySearch,
    PromptHistorySearchStatus, Reedline, ReedlineEvent, ReedlineMenu, Signal,
    default_emacs_keybindings,
};

use crate::highlighter::Highlighter;
use crate::lexer::{BracketValidator, calculate_depth};

const KEYWORDS: &[&str] = &["let", "fn", "if", "else", "return", "true", "false"];

/// Blaze - a small language compiled to bytecode and run on a stack VM
#[derive(Parser, Debug)]
#[command(name = "blaze")]
#[command(about = "Compile and run Blaze programs", long_about = None)]
struct Args {
    /// Print the parsed AST (for debugging)
    #[arg(long)]
    debug_parse: bool,

    /// Print the compiled bytecode (for debugging)
    #[arg(long)]
    debug_bytecode: bool,

    /// Operand stack capacity of the virtual machine
    #[arg(long, default_value_t = VmOptions::DEFAULT_STACK_SIZE)]
    stack_size: usize,

    /// Maximum call depth of the virtual machine
    #[arg(long, default_value_t = VmOptions::DEFAULT_MAX_FRAMES)]
    max_frames: usize,

    /// Run a source file instead of reading from stdin
    #[arg(long, conflicts_with = "expression")]
    file: Option<PathBuf>,

    /// Program to run (if not provided, reads from stdin)
    expression: Option<String>,
}

impl Args {
    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            vm: VmOptions {
                stack_size: self.stack_size,
                max_frames: self.max_frames,
            },
        }
    }
}

struct BlazePrompt;

impl Prompt for BlazePrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Borrowed("blaze")
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed(" >> ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("   .. ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}

fn add_menu_keybindings(keybindings: &mut Keybindings) {
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu("completion_menu".to_string()),
            ReedlineEvent::MenuNext,
        ]),
    );
    keybindings.add_binding(
        KeyModifiers::ALT,
        KeyCode::Enter,
        ReedlineEvent::Edit(vec![EditCommand::InsertNewline]),
    );
}

fn setup_reedline() -> Reedline {
    let commands: Vec<String> = KEYWORDS.iter().map(|k| k.to_string()).collect();

    let completer = Box::new({
        let mut completions = DefaultCompleter::with_inclusions(&['_']);
        completions.insert(commands);
        completions
    });

    // Use the interactive menu to select options from the completer
    let ide_menu = IdeMenu::default()
        .with_name("completion_menu")
        .with_min_completion_width(0)
        .with_max_completion_width(50)
        .with_max_completion_height(u16::MAX)
        .with_padding(0)
        .with_cursor_offset(0)
        .with_description_mode(DescriptionMode::PreferRight)
        .with_min_description_width(0)
        .with_max_description_width(50)
        .with_description_offset(1)
        .with_correct_cursor_pos(false);

    let completion_menu = Box::new(ide_menu);

    let mut keybindings = default_emacs_keybindings();
    add_menu_keybindings(&mut keybindings);

    let edit_mode = Box::new(Emacs::new(keybindings));

    Reedline::create()
        .with_highlighter(Box::new(Highlighter))
        .with_validator(Box::new(BracketValidator))
        .with_completer(completer)
        .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
        .with_edit_mode(edit_mode)
}

/// Runs one input through the session, printing the value or the error.
///
/// Returns `false` if any stage failed.
fn interpret_input(session: &mut Session, input: &str, args: &Args) -> bool {
    tracing::debug!(len = input.len(), "interpreting input");
    let program = match blaze::parse(input) {
        Ok(program) => program,
        Err(e) => {
            render_error(input, &e.into());
            return false;
        }
    };

    if args.debug_parse {
        println!("=== Parsed AST ===");
        println!("{:#?}", program);
        println!();
    }

    let bytecode = match session.compile(&program) {
        Ok(bytecode) => bytecode,
        Err(e) => {
            report(input, &e);
            return false;
        }
    };

    if args.debug_bytecode {
        println!("=== Bytecode ===");
        println!("{:?}", bytecode);
        println!();
    }

    match session.execute(bytecode) {
        Ok(value) => {
            println!("{}", value);
            true
        }
        Err(e) => {
            report(input, &e);
            false
        }
    }
}

fn report(input: &str, error: &Error) {
    match error {
        Error::Parse(_) => render_error(input, error),
        Error::Compile(inner) => eprintln!("Woops! Compilation failed:\n {}", inner),
        Error::Runtime(inner) => eprintln!("Woops! Executing bytecode failed:\n {}", inner),
    }
}

/// Runs a whole program at once. The error has already been printed, so
/// the returned report only carries the exit status.
fn run_once(session: &mut Session, source: &str, args: &Args) -> Result<()> {
    if interpret_input(session, source, args) {
        Ok(())
    } else {
        Err(miette::miette!("program did not run to completion"))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging subscriber
    use tracing_subscriber::{EnvFilter, fmt};

    // RUST_LOG controls the level; default to WARN if not set
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .into_diagnostic()?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut session = Session::new(args.session_options());

    if let Some(path) = &args.file {
        let source = std::fs::read_to_string(path).into_diagnostic()?;
        return run_once(&mut session, &source, &args);
    }

    // Check if we have a direct expression argument
    if let Some(expr) = &args.expression {
        return run_once(&mut session, expr, &args);
    }

    // Otherwise, check if we're in interactive or pipe mode
    let is_interactive = atty::is(atty::Stream::Stdin);

    if is_interactive {
        // Interactive REPL mode
        let mut line_editor = setup_reedline();
        let prompt = BlazePrompt;

        println!("Blaze REPL - Type programs to run (Ctrl+D or Ctrl+C to exit)");

        loop {
            let sig = match line_editor.read_line(&prompt) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Reedline error: {e}");
                    return Ok(());
                }
            };

            match sig {
                Signal::Success(buffer) => {
                    if !buffer.trim().is_empty() {
                        interpret_input(&mut session, &buffer, &args);
                    }
                }
                Signal::CtrlD | Signal::CtrlC => {
                    println!("\nGoodbye!");
                    return Ok(());
                }
            }
        }
    } else {
        // Pipe/stdin mode: lines are joined while brackets remain open
        let stdin = std::io::stdin();
        let reader = BufReader::new(stdin.lock());
        let mut pending = String::new();

        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("Error reading line from stdin: {}", e);
                    return Ok(());
                }
            };

            pending.push_str(&line);
            pending.push('\n');
            if matches!(calculate_depth(&pending), Some(depth) if depth > 0) {
                continue;
            }

            if !pending.trim().is_empty() {
                interpret_input(&mut session, &pending, &args);
            }
            pending.clear();
        }

        if !pending.trim().is_empty() {
            interpret_input(&mut session, &pending, &args);
        }
    }

    Ok(())
}
