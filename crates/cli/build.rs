use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("tidymark")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Tidymark Contributors")
        .about("Turn web pages into clean Markdown with front-matter")
        .arg(clap::arg!(<URL> "Page URL; also selects the cleaning strategy when --input-file is given"))
        .arg(clap::arg!(--raw "Print the cleaned content as-is, without front-matter or Markdown conversion"))
        .arg(
            clap::arg!(--input_file <FILE> "Read the page HTML from FILE (\"-\" for stdin) instead of fetching URL")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--exclude <REGEX> "Regex of URLs to pass through uncleaned (repeatable)")
                .value_name("REGEX")
                .action(clap::ArgAction::Append),
        )
        .arg(
            clap::arg!(--exclude_file <FILE> "File with one exclusion regex per line")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--user_agent <UA> "Custom User-Agent for HTTP requests").value_name("UA"))
        .arg(
            clap::arg!(--char_threshold <NUM> "Minimum character threshold for readable content")
                .default_value("500"),
        )
        .arg(clap::arg!(--no_images "Strip images from readability output"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "tidymark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "tidymark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "tidymark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "tidymark", &completions_dir).unwrap();

    println!("cargo:warning=Shell completions generated in: {}", completions_dir.display());
}
