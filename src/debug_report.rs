use soundshift::{CorpusResult, RunMetrics, SoundChanger, WordResult};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_corpus(changer: &SoundChanger, result: &CorpusResult, metrics: &RunMetrics, color: bool) {
    let palette = ansi::Palette::new(color);

    for word in &result.words {
        print_word(changer, word, &palette);
    }

    println!("\n{}", palette.paint("━━━ Rules ━━━", ansi::GRAY));
    print_rules(changer, metrics, &palette);

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Compile: {}  │  Apply: {}  │  Words: {} ({} changed)",
        palette.paint(format!("{:?}", metrics.total), ansi::GREEN),
        palette.paint(format!("{:?}", metrics.compile), ansi::CYAN),
        palette.dim(format!("{:?}", metrics.apply)),
        palette.paint(metrics.words.to_string(), ansi::BLUE),
        metrics.changed,
    );
    println!();
}

fn print_word(changer: &SoundChanger, word: &WordResult, palette: &ansi::Palette) {
    let inventory = changer.inventory();
    let derivation = &word.derivation;
    println!(
        "\n{} {}",
        palette.paint(format!("[{}]", word.line), ansi::GRAY),
        palette.bold(palette.paint(derivation.input.bare_string(inventory), ansi::CYAN))
    );

    for diagnostic in &word.diagnostics {
        println!(
            "    {} {}",
            palette.paint(format!("dropped '{}'", diagnostic.character), ansi::YELLOW),
            palette.dim(format!("at column {}", diagnostic.column))
        );
    }

    if derivation.stages.is_empty() {
        println!("    {}", palette.dim("no rule fired"));
        return;
    }
    for stage in &derivation.stages {
        let rule = changer.book().get(stage.rule);
        println!(
            "    {} {}  {} {}",
            palette.dim("→"),
            palette.paint(stage.word.bare_string(inventory), ansi::GREEN),
            palette.dim(format!("│ rule {} (line {}):", stage.rule + 1, rule.map_or(0, |r| r.line))),
            palette.paint(changer.rule_source(stage.rule).unwrap_or("?"), ansi::BLUE),
        );
    }
}

fn print_rules(changer: &SoundChanger, metrics: &RunMetrics, palette: &ansi::Palette) {
    for rule in changer.book().rules() {
        let fired = metrics.fired.get(rule.index).copied().unwrap_or(0);
        println!(
            "  {} {}  {} {}",
            palette.paint(format!("[{}]", rule.index + 1), ansi::GRAY),
            palette.paint(&rule.source, ansi::BLUE),
            palette.dim("sites:"),
            if fired > 0 {
                palette.paint(fired.to_string(), ansi::GREEN)
            } else {
                palette.dim(format!("{fired} ({:?})", rule.shape))
            },
        );
    }
    let idle = metrics.idle_rules().count();
    if idle > 0 {
        println!("  {}", palette.paint(format!("{idle} rule(s) never fired"), ansi::YELLOW));
    }
}
