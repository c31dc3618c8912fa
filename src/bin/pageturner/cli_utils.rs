use anyhow::Result;
use pageturner::audio;
use pageturner::pipeline::PipelineStats;

pub(crate) fn list_input_devices() -> Result<()> {
    // PAGETURNER_TEST_DEVICES stands in for real hardware in tests.
    let devices = if let Ok(raw) = std::env::var("PAGETURNER_TEST_DEVICES") {
        parse_device_list(&raw)
    } else {
        audio::Recorder::list_devices().unwrap_or_else(|err| {
            eprintln!("Failed to list audio input devices: {err}");
            Vec::new()
        })
    };

    if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for name in devices {
            println!("  - {name}");
        }
    }
    Ok(())
}

fn parse_device_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

pub(crate) fn format_session_stats(stats: &PipelineStats, restarts: u64) -> String {
    format!(
        "pageturner_stats|ticks={}|blocks={}|evaluated={}|gated={}|commands={}|shipped={}|classifier_errors={}|host_errors={}|restarts={restarts}",
        stats.ticks,
        stats.blocks,
        stats.evaluated_windows,
        stats.gated_windows,
        stats.commands,
        stats.shipped_windows,
        stats.classifier_errors,
        stats.host_errors,
    )
}
