use serde_json::json;
use std::fmt::Write as _;

use crate::workflows::assessment::catalog::{segment_explanation, tier_explanation, QuestionCatalog};
use crate::workflows::assessment::domain::{Rating, UserProfile, MATURITY_BANDS};
use crate::workflows::assessment::session::{ResultsSnapshot, OVERALL_SCORE_KEY};

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:860px;margin:2rem auto;padding:0 1rem;color:#1f2933}\
fieldset{border:1px solid #d9e2ec;border-radius:6px;margin-bottom:1rem}\
label{display:block;margin:.35rem 0}\
table{border-collapse:collapse;width:100%;margin:1rem 0}\
td,th{border:1px solid #d9e2ec;padding:.4rem;text-align:left}\
.notice{background:#fff3c4;padding:.6rem;border-radius:4px}\
.success{background:#e3f9e5;padding:.6rem;border-radius:4px}\
.error{background:#ffe3e3;padding:.6rem;border-radius:4px}\
progress{width:100%}";

/// Data for the checkout screen.
#[derive(Debug, Clone)]
pub struct CheckoutView {
    pub checkout_key: String,
    pub order_id: String,
    pub amount_minor: u64,
    pub currency: String,
    pub paid: bool,
    pub prefill_name: String,
    pub prefill_email: String,
    pub notice: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QuestionView {
    pub index: usize,
    pub text: String,
    pub selected: Rating,
}

/// Data for the questionnaire screen.
#[derive(Debug, Clone)]
pub struct QuestionnaireView {
    pub segment: String,
    pub tier: String,
    pub questions: Vec<QuestionView>,
    pub progress: u8,
    pub notice: Option<String>,
}

pub fn render_login(catalog: &QuestionCatalog, notice: Option<&str>) -> String {
    let mut body = String::new();
    body.push_str("<h1>TAICC AI Readiness Assessment</h1>");
    body.push_str("<p>Fill out your details to begin the assessment.</p>");
    push_notice(&mut body, notice);

    body.push_str("<form method=\"post\" action=\"/login\"><fieldset>");
    for (name, label) in [
        ("name", "Full Name"),
        ("company", "Company Name"),
        ("email", "Email Address"),
        ("phone", "Phone Number"),
    ] {
        let _ = write!(
            body,
            "<label>{label}<br><input type=\"text\" name=\"{name}\"></label>"
        );
    }

    body.push_str("<label>Select Your Domain<br><select name=\"segment\">");
    for segment in catalog.segments() {
        push_option(&mut body, segment, segment_explanation(segment));
    }
    body.push_str("</select></label>");

    body.push_str("<label>Select Your Tier<br><select name=\"tier\">");
    for tier in catalog.tiers() {
        push_option(&mut body, tier, tier_explanation(tier));
    }
    body.push_str("</select></label>");

    body.push_str("</fieldset><button type=\"submit\">Start Assessment</button></form>");
    page_shell("TAICC AI Readiness", &body)
}

pub fn render_payment(view: &CheckoutView) -> String {
    let mut body = String::new();
    body.push_str("<h1>Unlock Your AI Readiness Assessment</h1>");
    push_notice(&mut body, view.notice.as_deref());

    let _ = write!(
        body,
        "<p>Assessment fee: <strong>{}</strong> (order {})</p>",
        escape_html(&format_amount(view.amount_minor, &view.currency)),
        escape_html(&view.order_id)
    );

    if view.paid {
        body.push_str("<p class=\"success\">Payment received.</p>");
        body.push_str(
            "<form method=\"post\" action=\"/payment/confirm\">\
             <button type=\"submit\">Continue to assessment</button></form>",
        );
        return page_shell("Payment", &body);
    }

    let options = json!({
        "key": view.checkout_key,
        "amount": view.amount_minor,
        "currency": view.currency,
        "order_id": view.order_id,
        "name": "TAICC",
        "description": "AI Readiness Assessment",
        "prefill": { "name": view.prefill_name, "email": view.prefill_email },
    });

    body.push_str("<button id=\"pay\" type=\"button\">Pay now</button>");
    body.push_str(
        "<form id=\"verify\" method=\"post\" action=\"/payment/verify\">\
         <p>Already paid? Verification can take up to a minute.</p>\
         <button type=\"submit\">Verify payment</button></form>",
    );
    body.push_str("<script src=\"https://checkout.razorpay.com/v1/checkout.js\"></script>");
    let _ = write!(
        body,
        "<script>var options={};\
         options.handler=function(){{document.getElementById('verify').submit();}};\
         document.getElementById('pay').onclick=function(e){{new Razorpay(options).open();e.preventDefault();}};\
         </script>",
        script_safe_json(&options)
    );
    page_shell("Payment", &body)
}

pub fn render_questions(view: &QuestionnaireView) -> String {
    let mut body = String::new();
    body.push_str("<h1>AI Readiness Assessment</h1>");
    let _ = write!(
        body,
        "<p>{} / {}. Rate your organization on these factors.</p>",
        escape_html(&view.segment),
        escape_html(&view.tier)
    );
    push_notice(&mut body, view.notice.as_deref());

    body.push_str("<form method=\"post\" action=\"/questions\">");
    for question in &view.questions {
        let _ = write!(
            body,
            "<fieldset><legend>{}</legend>",
            escape_html(&question.text)
        );
        for rating in Rating::ordered() {
            let checked = if rating == question.selected {
                " checked"
            } else {
                ""
            };
            let _ = write!(
                body,
                "<label><input type=\"radio\" name=\"q{}\" value=\"{}\" data-index=\"{}\"{checked}> {}</label>",
                question.index,
                rating.label(),
                question.index,
                rating.label()
            );
        }
        body.push_str("</fieldset>");
    }

    let _ = write!(
        body,
        "<p>Progress: <span id=\"progress-label\">{progress}%</span></p>\
         <progress id=\"progress\" max=\"100\" value=\"{progress}\"></progress>",
        progress = view.progress
    );
    body.push_str("<button type=\"submit\">Submit</button></form>");
    body.push_str(
        "<script>document.querySelectorAll('input[type=radio]').forEach(function(input){\
         input.addEventListener('change',function(){\
         var data=new URLSearchParams({index:input.dataset.index,rating:input.value});\
         fetch('/questions/answer',{method:'POST',body:data}).then(function(r){return r.json();})\
         .then(function(p){document.getElementById('progress').value=p.progress;\
         document.getElementById('progress-label').textContent=p.progress+'%';});});});</script>",
    );
    page_shell("Assessment", &body)
}

pub fn render_results(profile: &UserProfile, results: &ResultsSnapshot) -> String {
    let mut body = String::new();
    body.push_str("<h1>AI Readiness Assessment Results</h1>");

    if let Some(warning) = &results.spreadsheet_warning {
        let _ = write!(
            body,
            "<p class=\"notice\">Your results could not be recorded: {}</p>",
            escape_html(warning)
        );
    }

    let _ = write!(
        body,
        "<table><tr><th>Section</th><th>Score</th></tr><tr><td>{OVERALL_SCORE_KEY}</td><td>{:.2}</td></tr></table>",
        results.average
    );
    let _ = write!(
        body,
        "<p class=\"success\">Your AI Maturity Level: <strong>{}</strong></p>",
        results.maturity.label()
    );

    let _ = write!(
        body,
        "<h2>Report for {}</h2>",
        escape_html(display_or(&profile.company, "your organization"))
    );
    for paragraph in results
        .narrative
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
    {
        let _ = write!(
            body,
            "<p>{}</p>",
            escape_html(paragraph).replace('\n', "<br>")
        );
    }

    body.push_str("<h2>AI Maturity Levels Explained</h2>");
    body.push_str("<table><tr><th>Score Range</th><th>Level</th><th>Description</th></tr>");
    for band in MATURITY_BANDS {
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            band.range_label(),
            band.level.label(),
            band.level.description()
        );
    }
    body.push_str("</table>");

    let _ = write!(
        body,
        "<p><small>Time taken: {}</small></p>",
        results.elapsed_label()
    );
    body.push_str(
        "<p><a href=\"/report.pdf\" download>Download Full Professional Report (PDF)</a></p>",
    );
    page_shell("Results", &body)
}

pub fn render_error(title: &str, message: &str) -> String {
    let body = format!(
        "<h1>{}</h1><p class=\"error\">{}</p><p><a href=\"/\">Back to the assessment</a></p>",
        escape_html(title),
        escape_html(message)
    );
    page_shell(title, &body)
}

fn page_shell(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{}</title><style>{STYLE}</style></head><body>{body}\
         <footer><small>TAICC: AI Transformation Partner</small></footer></body></html>",
        escape_html(title)
    )
}

fn push_notice(body: &mut String, notice: Option<&str>) {
    if let Some(message) = notice {
        let _ = write!(body, "<p class=\"notice\">{}</p>", escape_html(message));
    }
}

fn push_option(body: &mut String, value: &str, explanation: Option<&str>) {
    let label = match explanation {
        Some(text) => format!("{value} - {text}"),
        None => value.to_string(),
    };
    let _ = write!(
        body,
        "<option value=\"{}\">{}</option>",
        escape_html(value),
        escape_html(&label)
    );
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

pub(crate) fn format_amount(amount_minor: u64, currency: &str) -> String {
    format!("{} {}.{:02}", currency, amount_minor / 100, amount_minor % 100)
}

fn script_safe_json(value: &serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::assessment::domain::MaturityLevel;
    use std::time::Duration;

    fn profile() -> UserProfile {
        UserProfile {
            name: "Asha".to_string(),
            company: "<Sunrise>".to_string(),
            email: "asha@example.com".to_string(),
            phone: String::new(),
            segment: "Healthcare".to_string(),
            tier: "Tier 3".to_string(),
        }
    }

    fn snapshot(warning: Option<&str>) -> ResultsSnapshot {
        ResultsSnapshot {
            average: 3.0,
            maturity: MaturityLevel::Established,
            narrative: "First paragraph.\n\nSecond <b>paragraph</b>.".to_string(),
            elapsed: Duration::from_secs(125),
            report_pdf: Vec::new(),
            spreadsheet_warning: warning.map(str::to_string),
        }
    }

    #[test]
    fn login_lists_segments_with_explanations() {
        let catalog = QuestionCatalog::from_json_str(
            r#"{"Healthcare": {"Tier 1": ["q"]}, "BFSI": {"Tier 1": ["q"]}}"#,
        )
        .expect("catalog");
        let html = render_login(&catalog, Some("Choose a segment"));
        assert!(html.contains("<option value=\"Healthcare\">Healthcare - Hospitals"));
        assert!(html.contains("<option value=\"BFSI\">"));
        assert!(html.contains("<option value=\"Tier 1\">Tier 1 - Enterprise Leaders"));
        assert!(html.contains("Choose a segment"));
    }

    #[test]
    fn results_escape_narrative_and_show_bands() {
        let html = render_results(&profile(), &snapshot(None));
        assert!(html.contains("<p>First paragraph.</p>"));
        assert!(html.contains("Second &lt;b&gt;paragraph&lt;/b&gt;."));
        assert!(html.contains("Report for &lt;Sunrise&gt;"));
        assert!(html.contains("<td>2.1 - 3.0</td><td>Established</td>"));
        assert!(html.contains("<td>4.1 - 5.0</td><td>AI Leader</td>"));
        assert!(html.contains("Time taken: 2 min 5 sec"));
        assert!(html.contains("<td>Overall Score</td><td>3.00</td>"));
        assert!(html.contains("/report.pdf"));
        assert!(!html.contains("could not be recorded"));
    }

    #[test]
    fn results_surface_spreadsheet_warning() {
        let html = render_results(&profile(), &snapshot(Some("quota exceeded")));
        assert!(html.contains("could not be recorded: quota exceeded"));
        assert!(html.contains("/report.pdf"));
    }

    #[test]
    fn questions_preselect_recorded_rating() {
        let view = QuestionnaireView {
            segment: "Healthcare".to_string(),
            tier: "Tier 3".to_string(),
            questions: vec![QuestionView {
                index: 0,
                text: "Is patient data AI-ready?".to_string(),
                selected: Rating::Very,
            }],
            progress: 100,
            notice: None,
        };
        let html = render_questions(&view);
        assert!(html.contains("name=\"q0\" value=\"Very\" data-index=\"0\" checked"));
        assert!(!html.contains("value=\"Fully\" data-index=\"0\" checked"));
        assert!(html.contains("value=\"100\""));
    }

    #[test]
    fn payment_embeds_checkout_until_paid() {
        let mut view = CheckoutView {
            checkout_key: "rzp_test_key".to_string(),
            order_id: "order_123".to_string(),
            amount_minor: 49_900,
            currency: "INR".to_string(),
            paid: false,
            prefill_name: "</script>".to_string(),
            prefill_email: String::new(),
            notice: None,
        };
        let html = render_payment(&view);
        assert!(html.contains("checkout.razorpay.com"));
        assert!(html.contains("\"order_id\":\"order_123\""));
        assert!(html.contains("INR 499.00"));
        assert!(!html.contains("\"name\":\"</script>\""));

        view.paid = true;
        let html = render_payment(&view);
        assert!(html.contains("/payment/confirm"));
        assert!(!html.contains("checkout.razorpay.com"));
    }

    #[test]
    fn error_page_escapes_message() {
        let html = render_error("Report unavailable", "upstream <timeout>");
        assert!(html.contains("upstream &lt;timeout&gt;"));
    }
}
