//! HTML pages for the browser form

use priority_lib::{
    models::{SCALE_CHOICES, STATUS_CHOICES},
    ArtifactInfo, SinglePrediction, TicketRecord,
};
use std::fmt::Write;

const TITLE: &str = "ITSM Ticket Priority: Inference App";

const EXPECTED_COLUMNS: &str = "Impact, Urgency, No_of_Reassignments, Resolution_Time_hours (or Handle_Time_hrs),\n\
No_of_Related_Interactions, No_of_Related_Incidents, No_of_Related_Changes,\n\
Status, Category, Closure_Code";

/// Outcome block rendered above the form
pub enum Notice<'a> {
    None,
    Prediction(&'a SinglePrediction),
    Error(&'a str),
}

/// Landing page with the single-record form and the CSV upload form
pub fn index(models: &[ArtifactInfo], record: &TicketRecord, notice: Notice<'_>) -> String {
    let mut body = String::new();

    let _ = writeln!(body, "<h1>{}</h1>", TITLE);
    for (i, model) in models.iter().enumerate() {
        let class = if i == 0 { "success" } else { "info" };
        let prefix = if i == 0 {
            "Loaded model"
        } else {
            "Optional model also loaded"
        };
        let _ = writeln!(
            body,
            "<p class=\"{}\">{}: {} (version {})</p>",
            class,
            prefix,
            escape(&model.name),
            escape(&model.version)
        );
    }

    match notice {
        Notice::None => {}
        Notice::Prediction(prediction) => {
            let _ = write!(
                body,
                "<div class=\"badge\"><b>Predicted Priority:</b> {}",
                escape(&prediction.label)
            );
            if let Some(confidence) = prediction.confidence {
                let _ = write!(body, " &nbsp;&bull;&nbsp; <b>Confidence:</b> {:.2}", confidence);
            }
            body.push_str("</div>\n");
            if let Some(secondary) = &prediction.secondary {
                let _ = writeln!(
                    body,
                    "<p class=\"info\">Secondary model prediction: <b>{}</b></p>",
                    escape(&secondary.to_string())
                );
            }
        }
        Notice::Error(message) => {
            let _ = writeln!(body, "<pre class=\"error\">{}</pre>", escape(message));
        }
    }

    body.push_str(&single_form(record));
    body.push_str("<hr>\n");
    body.push_str(&batch_form());

    layout(&body)
}

/// Standalone error page
pub fn error(message: &str) -> String {
    layout(&format!(
        "<h1>{}</h1>\n<pre class=\"error\">{}</pre>\n<p><a href=\"/\">Back</a></p>\n",
        TITLE,
        escape(message)
    ))
}

fn single_form(record: &TicketRecord) -> String {
    let mut form = String::from("<h3>Single Prediction</h3>\n<form method=\"post\" action=\"/predict\">\n");

    form.push_str(&scale_select("impact", "Impact (1-5)", record.impact));
    form.push_str(&scale_select("urgency", "Urgency (1-5)", record.urgency));
    form.push_str(&number_input("reassignments", "No_of_Reassignments", &record.reassignments.to_string(), "1"));
    form.push_str(&number_input("handle_time_hrs", "Handle_Time_hrs", &record.handle_time_hrs.to_string(), "0.5"));
    form.push_str(&number_input(
        "related_interactions",
        "No_of_Related_Interactions",
        &record.related_interactions.to_string(),
        "1",
    ));
    form.push_str(&number_input(
        "related_incidents",
        "No_of_Related_Incidents",
        &record.related_incidents.to_string(),
        "1",
    ));
    form.push_str(&number_input(
        "related_changes",
        "No_of_Related_Changes",
        &record.related_changes.to_string(),
        "1",
    ));

    form.push_str("<label>Status <select name=\"status\">");
    for status in STATUS_CHOICES {
        let selected = if *status == record.status { " selected" } else { "" };
        let _ = write!(form, "<option{}>{}</option>", selected, status);
    }
    form.push_str("</select></label>\n");

    form.push_str(&text_input("category", "Category", &record.category));
    form.push_str(&text_input("closure_code", "Closure_Code", &record.closure_code));
    form.push_str("<button type=\"submit\">Predict</button>\n</form>\n");
    form
}

fn batch_form() -> String {
    format!(
        "<h3>Batch Prediction (CSV)</h3>\n\
         <p>Upload a CSV with these columns (headers can include aliases; they will be aligned):</p>\n\
         <pre>{}</pre>\n\
         <form method=\"post\" action=\"/batch\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"file\" accept=\".csv\">\n\
         <button type=\"submit\">Download Predictions (CSV)</button>\n\
         </form>\n",
        EXPECTED_COLUMNS
    )
}

fn scale_select(name: &str, label: &str, current: u8) -> String {
    let mut out = format!("<label>{} <select name=\"{}\">", label, name);
    for value in SCALE_CHOICES {
        let selected = if value == current { " selected" } else { "" };
        let _ = write!(out, "<option{}>{}</option>", selected, value);
    }
    out.push_str("</select></label>\n");
    out
}

fn number_input(name: &str, label: &str, value: &str, step: &str) -> String {
    format!(
        "<label>{} <input type=\"number\" name=\"{}\" min=\"0\" step=\"{}\" value=\"{}\"></label>\n",
        label,
        name,
        step,
        escape(value)
    )
}

fn text_input(name: &str, label: &str, value: &str) -> String {
    format!(
        "<label>{} <input type=\"text\" name=\"{}\" value=\"{}\"></label>\n",
        label,
        name,
        escape(value)
    )
}

fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
         <style>\n\
         body {{ font-family: sans-serif; max-width: 720px; margin: 2rem auto; }}\n\
         label {{ display: block; margin: 0.4rem 0; }}\n\
         .badge {{ padding: 10px 14px; border-radius: 10px; background: #f0f9ff; border: 1px solid #bae6fd; display: inline-block; font-size: 1.05rem; }}\n\
         .success {{ color: #166534; }}\n\
         .info {{ color: #1e40af; }}\n\
         .error {{ color: #991b1b; white-space: pre-wrap; }}\n\
         </style>\n</head>\n<body>\n{}</body>\n</html>\n",
        TITLE, body
    )
}

/// Escape text for inclusion in HTML
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
