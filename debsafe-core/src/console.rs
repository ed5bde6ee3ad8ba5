use std::env;
use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();
static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::Relaxed);
}

pub fn is_logging_enabled() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

fn use_color() -> bool {
    static USE_COLOR: OnceLock<bool> = OnceLock::new();
    *USE_COLOR.get_or_init(|| env::var_os("NO_COLOR").is_none())
}

fn is_tty() -> bool {
    static IS_TTY: OnceLock<bool> = OnceLock::new();
    *IS_TTY.get_or_init(|| io::stderr().is_terminal())
}

fn paint(code: &str, text: &str) -> String {
    if use_color() {
        format!("\u{1b}[{}m{}\u{1b}[0m", code, text)
    } else {
        text.to_string()
    }
}

pub fn dim(text: &str) -> String {
    paint("2", text)
}

pub fn bold(text: &str) -> String {
    paint("1", text)
}

fn green(text: &str) -> String {
    paint("32", text)
}

fn cyan(text: &str) -> String {
    paint("36", text)
}

fn yellow(text: &str) -> String {
    paint("33", text)
}

fn red(text: &str) -> String {
    paint("31", text)
}

pub fn elapsed_secs() -> f32 {
    START_TIME
        .get()
        .map(|t| t.elapsed().as_secs_f32())
        .unwrap_or(0.0)
}

pub fn header(command: &str) {
    START_TIME.get_or_init(Instant::now);
    eprintln!(
        "{}",
        dim(&format!("debsafe {} v{}", command, env!("CARGO_PKG_VERSION")))
    );
    eprintln!();
}

pub fn step(message: &str) {
    if is_tty() {
        eprint!("\r\u{1b}[K{}\n", dim(message));
        let _ = io::stderr().flush();
    } else {
        eprintln!("{}", dim(message));
    }
}

pub fn step_with_count(message: &str, count: usize) {
    if is_tty() {
        eprint!("\r\u{1b}[K{} {}\n", message, cyan(&format!("[{}]", count)));
        let _ = io::stderr().flush();
    } else {
        eprintln!("{} {}", message, cyan(&format!("[{}]", count)));
    }
}

pub fn progress(emoji: &str, message: &str, current: usize, total: usize) {
    if is_tty() {
        eprint!(
            "\r\u{1b}[K{} {} {}",
            emoji,
            dim(message),
            cyan(&format!("[{}/{}]", current, total))
        );
        let _ = io::stderr().flush();
    }
}

pub fn clear_line() {
    if is_tty() {
        eprint!("\r\u{1b}[K");
        let _ = io::stderr().flush();
    }
}

pub fn planned(position: usize, name: &str, version: &str, architecture: &str) {
    println!(
        "{} {} {}",
        dim(&format!("{:>3}.", position)),
        name,
        dim(&format!("{} [{}]", version, architecture))
    );
}

pub fn installed(name: &str, version: &str) {
    println!("{} {} {}", green("+"), name, dim(version));
}

pub fn failed(name: &str, version: &str, reason: &str) {
    println!("{} {} {} {}", red("x"), name, dim(version), red(reason));
}

pub fn skipped(name: &str, version: &str) {
    println!("{} {} {}", yellow("-"), name, dim(&format!("{} (skipped)", version)));
}

pub fn blocked_tag() -> String {
    red("[blocked]")
}

pub fn summary(installed: usize, failed: usize, skipped: usize, seconds: f32) {
    println!();
    let time_str = if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else {
        format!("{:.2}s", seconds)
    };
    let noun = if installed == 1 { "package" } else { "packages" };

    let mut line = format!("{} {} installed", installed, noun);
    if failed > 0 {
        line.push_str(&format!(", {}", red(&format!("{} failed", failed))));
    }
    if skipped > 0 {
        line.push_str(&format!(", {}", yellow(&format!("{} skipped", skipped))));
    }

    println!("{} {}", line, dim(&format!("[{}]", time_str)));
}

pub fn warn(message: &str) {
    let tag = yellow("warn");
    eprintln!("{} {}", tag, message);
}

pub fn error(message: &str) {
    let tag = red("error");
    eprintln!("{} {}", tag, message);
}

pub fn verbose(message: &str) {
    if is_logging_enabled() {
        clear_line();
        eprintln!("{} {}", dim("verbose"), dim(message));
    } else {
        tracing::debug!("{message}");
    }
}

pub fn info(message: &str) {
    println!("{}", message);
}
