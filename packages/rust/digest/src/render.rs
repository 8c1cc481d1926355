//! HTML digest rendering.
//!
//! Pure function over the emitted record set: patent cases lead, non-patent
//! cases follow behind a divider, and each section splits precedential
//! decisions from the rest. A record with no category groups with the
//! patent section; classification failure must never hide a case.

use std::fmt::Write;

use chrono::NaiveDate;
use docketwatch_shared::{CaseRecord, Category};

/// A rendered digest ready for a [`crate::DeliverySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDigest {
    pub subject: String,
    pub html: String,
}

const HTML_HEADER: &str = r#"<!DOCTYPE html>
<html>
<head>
    <style>
        body {
            font-family: Arial, sans-serif;
            line-height: 1.6;
            max-width: 800px;
            margin: 0 auto;
            padding: 20px;
            background-color: #f5f5f5;
        }
        .email-container {
            background-color: white;
            padding: 30px;
            border-radius: 5px;
            box-shadow: 0 2px 5px rgba(0,0,0,0.1);
        }
        h1 {
            color: #2c3e50;
            border-bottom: 2px solid #3498db;
            padding-bottom: 10px;
            font-size: 24px;
            margin-bottom: 20px;
        }
        h3 {
            color: #34495e;
            margin-top: 20px;
            margin-bottom: 12px;
            font-size: 16px;
        }
        .decision-list {
            margin: 15px 0;
        }
        .decision-item {
            background-color: #f8f9fa;
            padding: 15px;
            margin-bottom: 10px;
            border-radius: 5px;
            border-left: 3px solid #3498db;
        }
        .decision-item.precedential {
            border-left-color: #e74c3c;
            background-color: #fff5f5;
        }
        .decision-title {
            font-weight: bold;
            color: #2c3e50;
            font-size: 15px;
            margin-bottom: 5px;
        }
        .decision-meta {
            font-size: 13px;
            color: #7f8c8d;
        }
        .decision-summary {
            margin-top: 8px;
            font-size: 14px;
            color: #34495e;
            line-height: 1.5;
        }
        .section-divider {
            height: 1px;
            background: #e0e0e0;
            margin: 20px 0;
        }
        .no-decisions-box {
            background-color: #f8f9fa;
            padding: 25px;
            border-radius: 5px;
            text-align: center;
            margin: 20px 0;
            border: 1px solid #e9ecef;
        }
        .no-decisions-box p {
            font-size: 16px;
            color: #7f8c8d;
            margin: 0 0 10px 0;
        }
        .footer {
            margin-top: 30px;
            padding-top: 15px;
            border-top: 1px solid #bdc3c7;
            color: #7f8c8d;
            font-size: 12px;
            text-align: center;
        }
        .footer a {
            color: #3498db;
        }
    </style>
</head>
<body>
    <div class="email-container">
"#;

const HTML_FOOTER: &str = r#"        <div class="footer">
            <p>Generated by docketwatch from the court's public decision feed.</p>
        </div>
    </div>
</body>
</html>
"#;

/// Render the digest for `records` under the date line `today`.
pub fn render_digest(records: &[CaseRecord], today: NaiveDate) -> RenderedDigest {
    let date_str = today.format("%B %d, %Y").to_string();
    let subject = format!("CAFC Daily Decisions - {date_str}");

    // Fail-open grouping: only an explicit NonPatent tag leaves the lead
    // section.
    let (patent, non_patent): (Vec<&CaseRecord>, Vec<&CaseRecord>) = records
        .iter()
        .partition(|r| r.category != Some(Category::NonPatent));

    let mut html = String::from(HTML_HEADER);

    let _ = write!(
        html,
        "        <h1>CAFC Daily Decisions - {date_str}</h1>\n\n\
         \x20       <p>Here is today's update from the Court of Appeals for the Federal Circuit:</p>\n\
         \x20       <p style=\"font-size: 13px; color: #e74c3c; font-weight: bold;\">\
         <strong>ALL DECISION SUMMARIES ARE AI-GENERATED AND MAY CONTAIN ERRORS. \
         PLEASE REFER TO THE FULL DECISIONS FOR ACCURATE INFORMATION.</strong></p>\n\n"
    );

    if !patent.is_empty() {
        render_section(&mut html, &patent, "Patent Cases");
    }

    if !non_patent.is_empty() {
        html.push_str(
            "        <div style=\"height: 3px; background: #bdc3c7; margin: 40px 0 30px 0;\"></div>\n\n",
        );
        render_section(&mut html, &non_patent, "Non-Patent Cases");
    }

    if patent.is_empty() && non_patent.is_empty() {
        let _ = write!(
            html,
            "        <div class=\"no-decisions-box\">\n\
             \x20           <p><em>No decisions were issued on {date_str}.</em></p>\n\
             \x20           <p style=\"font-size: 14px; color: #95a5a6;\">The Court did not release any opinions or orders today.</p>\n\
             \x20       </div>\n\n"
        );
    }

    html.push_str(HTML_FOOTER);

    RenderedDigest { subject, html }
}

fn render_section(html: &mut String, records: &[&CaseRecord], section_title: &str) {
    let _ = write!(
        html,
        "        <h2 style=\"color: #2c3e50; font-size: 18px; margin-bottom: 16px;\">{section_title}</h2>\n\
         \x20       <div class=\"decision-list\">\n"
    );

    let precedential: Vec<&&CaseRecord> = records.iter().filter(|r| r.is_precedential).collect();
    let nonprecedential: Vec<&&CaseRecord> =
        records.iter().filter(|r| !r.is_precedential).collect();

    if !precedential.is_empty() {
        let _ = write!(
            html,
            "            <h3>Precedential Decisions ({})</h3>\n",
            precedential.len()
        );
        for record in &precedential {
            render_item(html, record);
        }
    }

    if !nonprecedential.is_empty() {
        if !precedential.is_empty() {
            html.push_str("            <div class=\"section-divider\"></div>\n");
        }
        let _ = write!(
            html,
            "            <h3>Nonprecedential Decisions and Orders ({})</h3>\n",
            nonprecedential.len()
        );
        for record in &nonprecedential {
            render_item(html, record);
        }
    }

    html.push_str("        </div>\n\n");
}

fn render_item(html: &mut String, record: &CaseRecord) {
    let prec_class = if record.is_precedential {
        " precedential"
    } else {
        ""
    };

    let mut summary_html = String::new();
    if let Some(summary) = &record.summary {
        let pdf_link = if record.has_document() {
            format!(
                " <a href=\"{}\" style=\"color: #3498db;\">View Full Decision (PDF)</a>",
                escape_html(&record.document_url)
            )
        } else {
            String::new()
        };
        summary_html = format!(
            "\n                <div class=\"decision-summary\">{}{pdf_link}</div>",
            escape_html(summary)
        );
    }

    let _ = write!(
        html,
        "            <div class=\"decision-item{prec_class}\">\n\
         \x20               <div class=\"decision-title\">{title}</div>\n\
         \x20               <div class=\"decision-meta\">\n\
         \x20                   Appeal No. {case_id} | Origin: {origin} | {kind}\n\
         \x20               </div>{summary_html}\n\
         \x20           </div>\n",
        title = escape_html(&record.title),
        case_id = escape_html(&record.case_id),
        origin = escape_html(&record.origin),
        kind = record.document_kind.as_str(),
    );
}

/// Minimal HTML entity escaping for text and attribute values.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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
