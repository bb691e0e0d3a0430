use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::processing::ImportOutcome;

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>FitVault</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 0; padding: 0; background: #f7f7f7; }
    header { background: #20232a; color: white; padding: 1rem 2rem; }
    main { padding: 2rem; max-width: 960px; margin: 0 auto; }
    .drop-zone { border: 2px dashed #888; padding: 2rem; background: white; text-align: center; }
    .drop-zone.drag { border-color: #2563eb; background: #eff6ff; }
    .summary-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr)); gap: 1rem; }
    .summary-card { background: white; padding: 1rem; border-radius: 4px; }
    .label { color: #555; margin: 0; }
    .value { font-size: 1.25rem; margin: 0.25rem 0 0; }
    button { background: #2563eb; color: white; border: none; padding: 0.75rem 1.5rem; border-radius: 4px; cursor: pointer; }
    button:hover { background: #1d4ed8; }
  </style>
</head>
<body>
  <header><h1>FitVault</h1></header>
  <main>
    <p>Upload a FIT file to import it as a workout.</p>
    <div id="drop-zone" class="drop-zone">
      <p>Drag & drop your FIT file here, or click to select.</p>
      <input id="file-input" type="file" accept=".fit" style="display:none" />
      <button id="select-btn" type="button">Choose a file</button>
    </div>
    <div id="results"></div>
  </main>
  <script>
    const dropZone = document.getElementById('drop-zone');
    const fileInput = document.getElementById('file-input');
    const selectBtn = document.getElementById('select-btn');
    const results = document.getElementById('results');

    const preventDefaults = (e) => { e.preventDefault(); e.stopPropagation(); };
    ['dragenter', 'dragover', 'dragleave', 'drop'].forEach(eventName => {
      dropZone.addEventListener(eventName, preventDefaults, false);
    });
    ['dragenter', 'dragover'].forEach(eventName => {
      dropZone.addEventListener(eventName, () => dropZone.classList.add('drag'), false);
    });
    ['dragleave', 'drop'].forEach(eventName => {
      dropZone.addEventListener(eventName, () => dropZone.classList.remove('drag'), false);
    });

    selectBtn.addEventListener('click', () => fileInput.click());
    dropZone.addEventListener('drop', (e) => upload(e.dataTransfer.files));
    fileInput.addEventListener('change', (e) => upload(e.target.files));

    async function upload(files) {
      if (!files || files.length === 0) {
        return;
      }
      const formData = new FormData();
      formData.append('file', files[0]);
      results.textContent = 'Importing...';
      try {
        const response = await fetch('/upload', { method: 'POST', body: formData });
        results.innerHTML = await response.text();
      } catch (err) {
        results.textContent = 'Upload failed: ' + err;
      }
    }
  </script>
</body>
</html>"#;

fn format_duration(seconds: Option<Decimal>) -> String {
    match seconds.and_then(|s| s.to_f64()) {
        Some(total) => {
            let rounded = total.round().max(0.0) as u64;
            let hours = rounded / 3600;
            let minutes = (rounded % 3600) / 60;
            let seconds = rounded % 60;

            if hours > 0 {
                format!("{}h {:02}m {:02}s", hours, minutes, seconds)
            } else {
                format!("{}m {:02}s", minutes, seconds)
            }
        }
        None => "-".to_string(),
    }
}

fn format_distance(meters: Option<Decimal>) -> String {
    match meters.and_then(|m| m.to_f64()) {
        Some(distance) if distance >= 1000.0 => format!("{:.2} km", distance / 1000.0),
        Some(distance) => format!("{:.0} m", distance),
        None => "-".to_string(),
    }
}

fn format_pace(speed: Option<Decimal>) -> String {
    match speed.and_then(|s| s.to_f64()) {
        Some(value) if value > 0.0 => {
            let total_minutes = 1000.0 / (value * 60.0);
            let whole_minutes = total_minutes.floor();
            let mut seconds = ((total_minutes - whole_minutes) * 60.0).round();

            // Rounding can carry into the next minute.
            let mut minutes = whole_minutes as u64;
            if seconds >= 60.0 {
                minutes += 1;
                seconds = 0.0;
            }

            format!("{}:{:02} min/km", minutes, seconds as u64)
        }
        _ => "-".to_string(),
    }
}

fn format_heart_rate(value: Option<i64>) -> String {
    match value {
        Some(hr) if hr > 0 => format!("{hr} bpm"),
        _ => "-".to_string(),
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn summary_card(label: &str, value: &str) -> String {
    format!(
        "<div class=\"summary-card\"><p class=\"label\">{label}</p><p class=\"value\">{}</p></div>",
        escape_html(value)
    )
}

pub fn render_landing_page() -> String {
    LANDING_PAGE.to_string()
}

/// HTML fragment describing a finished import.
pub fn render_import_summary(outcome: &ImportOutcome) -> String {
    let workout = &outcome.workout;
    let mut body = String::new();

    body.push_str("<section class=\"results-card\">");
    body.push_str(&format!(
        "<h2>{}</h2><p>{}</p>",
        escape_html(&workout.title),
        if outcome.duplicate {
            "Already imported"
        } else {
            "Imported"
        }
    ));

    body.push_str("<div class=\"summary-grid\">");
    body.push_str(&summary_card("Sport", workout.sport.display_name()));
    body.push_str(&summary_card(
        "Duration",
        &format_duration(workout.total_timer_time.or(workout.total_elapsed_time)),
    ));
    body.push_str(&summary_card(
        "Distance",
        &format_distance(workout.total_distance),
    ));
    body.push_str(&summary_card("Avg Pace", &format_pace(workout.avg_speed)));
    body.push_str(&summary_card(
        "Avg Heart Rate",
        &format_heart_rate(workout.avg_heart_rate),
    ));
    body.push_str(&summary_card(
        "Max Heart Rate",
        &format_heart_rate(workout.max_heart_rate),
    ));
    body.push_str(&summary_card("File", &outcome.import.original_filename));
    body.push_str("</div>");

    if !outcome.warnings.is_empty() {
        body.push_str("<ul class=\"warnings\">");
        for warning in &outcome.warnings {
            body.push_str(&format!("<li>{}</li>", escape_html(warning)));
        }
        body.push_str("</ul>");
    }

    body.push_str("</section>");
    body
}

/// HTML fragment for a failed upload.
pub fn render_import_error(message: &str) -> String {
    format!(
        "<section class=\"results-card\"><h2>Import failed</h2><p>{}</p></section>",
        escape_html(message)
    )
}
