//! Manual smoke-test binary.
//!
//! Not a configurable CLI surface — argument parsing, a real discovery
//! walker wired to a project, and report rendering are all out of scope
//! for this crate (see `lib.rs`). This binary just exercises the engine
//! end-to-end against a fixed in-memory sample so the pipeline can be
//! sanity-checked without a host interpreter.

use scriptcov::config::Config;
use scriptcov::discovery::GlobWalker;
use scriptcov::Engine;

const SAMPLE: &str = r#"
local function classify(x)
  if x > 0 then
    return "positive"
  elseif x < 0 then
    return "negative"
  else
    return "zero"
  end
end

return classify(5)
"#;

fn main() {
    tracing_subscriber::fmt::init();

    let mut config = Config::default();
    config.discover_uncovered = false;
    let engine = Engine::new(config, Box::new(GlobWalker));

    engine.init().expect("init");
    engine.start().expect("start");
    engine.track_file("sample.lua", SAMPLE).expect("track_file");

    // Stand in for a host interpreter's line hook: walk the lines a real
    // run of `classify(5)` would execute.
    for line in [2, 3, 4, 11] {
        engine.track_line("sample.lua", line);
    }
    engine.stop().expect("stop");

    let report = engine.get_report_data().expect("report");
    match serde_json::to_string_pretty(&report.summary) {
        Ok(json) => println!("{}", json),
        Err(err) => eprintln!("failed to serialize report: {}", err),
    }
}
