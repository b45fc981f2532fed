//! Terminal front-end: command parsing and text rendering.
//!
//! Everything printed here is a projection of [`AppController`] state; the
//! console never keeps configuration of its own.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::validator::{option_groups, API_LEVELS};
use crate::config::{ConfigField, FieldValue};
use crate::error::AppError;
use crate::models::{OptimizationFlag, OutputType, Severity};
use crate::orchestrator::{SessionOutcome, SessionUpdate};
use crate::wizard::{PrimaryAction, StepState, WizardStep};

use super::controller::{AppController, SessionView};
use super::log_sink::LogSink;

/// Lines of the log view shown in the summary panel.
const LOG_WINDOW: usize = 20;

/// One console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Goto(u8),
    Preset(String),
    Set(ConfigField, FieldValue),
    Toggle(ConfigField, String),
    Opt(OptimizationFlag, bool),
    Show,
    Save,
    Script,
    Compile,
    Clear,
    AutoScroll,
    Scroll(usize),
    Help,
    Quit,
    Empty,
}

pub const HELP: &str = "\
命令:
  next | n                下一步
  prev | p                上一步
  goto N                  跳转到第 N 步
  preset ID               选择预设
  set FIELD V1,V2,...     设置字段 (api, outputType, decoders, ...)
  toggle FIELD ITEM       切换单个选项
  opt FLAG on|off         设置优化开关 (disableAsm, enableSmall, ...)
  show                    重新显示当前步骤
  save                    保存配置
  script                  生成编译脚本
  compile                 开始编译
  clear                   清空日志
  autoscroll              切换自动滚动
  scroll N                日志视图停在第 N 行
  help                    显示帮助
  quit | q                退出";

fn invalid(msg: impl Into<String>) -> AppError {
    AppError::InvalidInput(msg.into())
}

fn parse_switch(raw: &str) -> Result<bool, AppError> {
    match raw.to_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        other => Err(invalid(format!("expected on|off, got '{}'", other))),
    }
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, AppError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_lowercase().as_str() {
        "next" | "n" => Command::Next,
        "prev" | "p" | "back" => Command::Prev,
        "goto" | "g" => {
            let n = rest
                .parse::<u8>()
                .map_err(|_| invalid(format!("goto expects a step number, got '{}'", rest)))?;
            Command::Goto(n)
        }
        "preset" => {
            if rest.is_empty() {
                return Err(invalid("preset expects an id"));
            }
            Command::Preset(rest.to_string())
        }
        "set" => {
            let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let field: ConfigField = field.parse()?;
            Command::Set(field, field.parse_value(value.trim())?)
        }
        "toggle" | "t" => {
            let (field, item) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| invalid("toggle expects FIELD ITEM"))?;
            Command::Toggle(field.parse()?, item.trim().to_string())
        }
        "opt" => {
            let (flag, value) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| invalid("opt expects FLAG on|off"))?;
            let flag = flag.parse::<OptimizationFlag>().map_err(invalid)?;
            Command::Opt(flag, parse_switch(value.trim())?)
        }
        "show" | "s" => Command::Show,
        "save" => Command::Save,
        "script" => Command::Script,
        "compile" | "c" => Command::Compile,
        "clear" => Command::Clear,
        "autoscroll" => Command::AutoScroll,
        "scroll" => {
            let n = rest
                .parse::<usize>()
                .map_err(|_| invalid(format!("scroll expects a line number, got '{}'", rest)))?;
            Command::Scroll(n)
        }
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(invalid(format!("unknown command '{}', try 'help'", other))),
    };
    Ok(command)
}

/// Multi-select field edited on a step, if any.
pub fn step_field(step: WizardStep) -> Option<ConfigField> {
    match step {
        WizardStep::Decoders => Some(ConfigField::Decoders),
        WizardStep::Encoders => Some(ConfigField::Encoders),
        WizardStep::Muxers => Some(ConfigField::Muxers),
        WizardStep::Demuxers => Some(ConfigField::Demuxers),
        WizardStep::Protocols => Some(ConfigField::Protocols),
        WizardStep::Filters => Some(ConfigField::Filters),
        WizardStep::Preset | WizardStep::BuildOptions | WizardStep::Summary => None,
    }
}

fn mark(on: bool) -> &'static str {
    if on {
        "[x]"
    } else {
        "[ ]"
    }
}

/// Step indicator line, e.g. `✓1 预设选择 › [2 解码器] › 3 编码器 ...`
pub fn render_indicator(controller: &AppController) -> String {
    controller
        .wizard()
        .step_states()
        .iter()
        .map(|(step, state)| match state {
            StepState::Completed => format!("✓{} {}", step.ordinal(), step.title()),
            StepState::Active => format!("[{} {}]", step.ordinal(), step.title()),
            StepState::Pending => format!("{} {}", step.ordinal(), step.title()),
        })
        .collect::<Vec<_>>()
        .join(" › ")
}

fn render_selection(out: &mut Vec<String>, selected: &[String], field: ConfigField) {
    let groups = option_groups(field.as_str()).unwrap_or(&[]);
    for group in groups {
        out.push(format!("  {}:", group.title));
        let row = group
            .items
            .iter()
            .map(|item| format!("{} {}", mark(selected.iter().any(|s| s == item)), item))
            .collect::<Vec<_>>()
            .join("  ");
        out.push(format!("    {}", row));
    }
    let extra: Vec<&str> = selected
        .iter()
        .filter(|s| !groups.iter().any(|g| g.items.contains(&s.as_str())))
        .map(String::as_str)
        .collect();
    if !extra.is_empty() {
        out.push(format!("  其他: {}", extra.join(", ")));
    }
}

fn render_log_view(out: &mut Vec<String>, sink: &LogSink) {
    out.push(format!("编译日志 ({})", sink.auto_scroll_label()));
    if sink.is_empty() {
        if let Some(placeholder) = sink.placeholder() {
            out.push(format!("  {}", placeholder));
        }
        return;
    }
    for event in sink.visible(LOG_WINDOW) {
        out.push(format!("  {}", LogSink::render_line(event)));
    }
}

/// Full text of the current step.
pub fn render_step(controller: &AppController) -> String {
    let wizard = controller.wizard();
    let step = wizard.current_step();
    let config = controller.config();
    let mut out = vec![render_indicator(controller), String::new(), format!("== {} ==", step)];

    match step {
        WizardStep::Preset => {
            if controller.presets().is_empty() {
                out.push("  (无可用预设)".to_string());
            }
            for preset in controller.presets().iter() {
                let selected = preset.id == config.preset;
                out.push(format!(
                    "  {} {:<12} {}  {}",
                    if selected { "(*)" } else { "( )" },
                    preset.id,
                    preset.name,
                    preset.description
                ));
            }
        }
        WizardStep::BuildOptions => {
            render_selection(&mut out, &config.architectures, ConfigField::Architectures);
            let apis = API_LEVELS
                .iter()
                .map(|api| {
                    if *api == config.api {
                        format!("<{}>", api)
                    } else {
                        api.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            out.push(format!("  API级别: {}", apis));
            let outputs = [OutputType::Shared, OutputType::Static]
                .iter()
                .map(|t| format!("{} {}", mark(*t == config.output_type), t))
                .collect::<Vec<_>>()
                .join("  ");
            out.push(format!("  输出类型: {}", outputs));
            out.push("  优化选项:".to_string());
            for flag in OptimizationFlag::ALL {
                out.push(format!(
                    "    {} {}",
                    mark(config.optimizations.get(flag)),
                    flag.as_str()
                ));
            }
        }
        WizardStep::Summary => {
            if controller.view() == SessionView::Summary {
                if let Some(summary) = wizard.summary() {
                    for (label, value) in summary.rows(controller.presets()) {
                        out.push(format!("  {:<8} {}", label, value));
                    }
                }
            } else {
                out.push(format!(
                    "  状态: {} ({}) {}%",
                    controller.status_text(),
                    controller.indicator().as_str(),
                    controller.progress()
                ));
            }
            out.push(format!("  [{}]", controller.affordance().label()));
            out.push(String::new());
            render_log_view(&mut out, controller.sink());
        }
        other => {
            if let Some(field) = step_field(other) {
                render_selection(&mut out, controller.model().list(field), field);
            }
        }
    }

    if let Some(error) = controller.last_validation_error() {
        out.push(String::new());
        out.push(format!("⚠ {}", error));
    }

    let back = if wizard.can_go_back() { "prev" } else { "(prev)" };
    let forward = match wizard.primary_action() {
        PrimaryAction::Next => "next",
        PrimaryAction::Compile => "compile",
    };
    out.push(String::new());
    out.push(format!("{} | {} | help", back, forward));
    out.join("\n")
}

pub fn render_notifications(controller: &AppController) -> Vec<String> {
    controller
        .reporter()
        .active()
        .iter()
        .map(|n| {
            let icon = match n.severity {
                Severity::Success => "✅",
                Severity::Error => "❌",
                Severity::Warning => "⚠",
                Severity::Info => "ℹ",
            };
            format!("{} {}", icon, n.message)
        })
        .collect()
}

/// Print the log lines appended since the last call.
pub fn print_new_log_lines(controller: &mut AppController) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    for event in controller.sink_mut().drain_unseen() {
        let _ = writeln!(handle, "{}", LogSink::render_line(event));
    }
}

/// Apply one parsed command. Returns false when the session should end.
pub async fn execute(controller: &mut AppController, command: Command) -> bool {
    let result: Result<(), AppError> = match command {
        Command::Empty => Ok(()),
        Command::Quit => return false,
        Command::Help => {
            println!("{}", HELP);
            return true;
        }
        Command::Show => Ok(()),
        Command::Next => {
            if controller.wizard().primary_action() == PrimaryAction::Compile {
                controller.start_compilation().await.map(|_| ())
            } else {
                controller.next_step().map(|_| ())
            }
        }
        Command::Prev => {
            controller.previous_step();
            Ok(())
        }
        Command::Goto(n) => controller.goto_step(n).map(|_| ()),
        Command::Preset(id) => controller.select_preset(&id).await,
        Command::Set(field, value) => controller.set_field(field, value),
        Command::Toggle(field, item) => controller.toggle_selection(field, &item).map(|_| ()),
        Command::Opt(flag, value) => {
            controller.set_optimization(flag, value);
            Ok(())
        }
        Command::Save => controller.save_config().await,
        Command::Script => controller.generate_script().await.map(|_| ()),
        Command::Compile => controller.start_compilation().await.map(|_| ()),
        Command::Clear => {
            controller.clear_logs();
            Ok(())
        }
        Command::AutoScroll => {
            controller.toggle_auto_scroll();
            Ok(())
        }
        Command::Scroll(line) => {
            controller.sink_mut().scroll_to(line);
            Ok(())
        }
    };

    // Request failures already surfaced as notifications, gate failures inline
    match &result {
        Err(AppError::Request(_)) | Err(AppError::Busy(_)) | Ok(()) => {}
        Err(AppError::Validation(_)) if controller.last_validation_error().is_some() => {}
        Err(e) => println!("✗ {}", e.user_message()),
    }
    redraw(controller);
    true
}

fn redraw(controller: &AppController) {
    println!();
    println!("{}", render_step(controller));
    for line in render_notifications(controller) {
        println!("{}", line);
    }
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Interactive wizard: stdin commands and supervisor events on one task.
pub async fn run_wizard(controller: &mut AppController) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    redraw(controller);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => break,
                };
                match parse_command(&line) {
                    Ok(command) => {
                        if !execute(controller, command).await {
                            break;
                        }
                    }
                    Err(e) => {
                        println!("✗ {}", e.user_message());
                        print!("> ");
                        let _ = std::io::stdout().flush();
                    }
                }
            }
            Some(event) = controller.next_event() => {
                match controller.handle_event(event) {
                    SessionUpdate::LogAppended => {
                        if controller.sink().auto_scroll() {
                            print_new_log_lines(controller);
                        }
                    }
                    SessionUpdate::Finished(_) => redraw(controller),
                    SessionUpdate::Progress(_) => {
                        println!(
                            "  状态: {} {}%",
                            controller.status_text(),
                            controller.progress()
                        );
                    }
                    SessionUpdate::StreamNotice(_) | SessionUpdate::Dropped => {}
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.shutdown();
    Ok(())
}

/// Drive the active job to completion, echoing log lines to stdout.
///
/// Returns `None` if interrupted before the job finished.
pub async fn follow_compilation(controller: &mut AppController) -> Option<SessionOutcome> {
    loop {
        tokio::select! {
            event = controller.next_event() => {
                let event = event?;
                match controller.handle_event(event) {
                    SessionUpdate::LogAppended => print_new_log_lines(controller),
                    SessionUpdate::Progress(_) => {
                        println!("[{}%] {}", controller.progress(), controller.status_text());
                    }
                    SessionUpdate::Finished(outcome) => return Some(outcome),
                    SessionUpdate::StreamNotice(message) => {
                        log::debug!("[Console] stream notice: {}", message);
                    }
                    SessionUpdate::Dropped => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                controller.shutdown();
                return None;
            }
        }
    }
}
