//! Minijinja rendering of alert messages and subject lines.
//!
//! Messages are HTML fragments. The template is registered under an `.html`
//! name so every interpolated value is HTML-escaped, including database
//! names and catalogue designations.

use serde::Serialize;

use mops_core::{Orbit, SubjectKind};

use crate::traits::NotifyError;

const MESSAGE_TEMPLATE_NAME: &str = "alert_message.html";

const MESSAGE_TEMPLATE: &str = r#"<p><b>{{ headline }}</b></p>
{%- if elements %}
<table>
<tr><td>a</td><td>{% if elements.a is none %}inf{% else %}{{ elements.a | round(3) }}{% endif %} AU</td></tr>
<tr><td>e</td><td>{{ elements.e | round(3) }}</td></tr>
<tr><td>q</td><td>{{ elements.q | round(3) }} AU</td></tr>
<tr><td>i</td><td>{{ elements.i | round(3) }} deg</td></tr>
<tr><td>H</td><td>{% if elements.h is none %}-{% else %}{{ elements.h | round(3) }}{% endif %}</td></tr>
</table>
{%- endif %}
{%- if details %}
<ul>
{%- for d in details %}
<li>{{ d[0] }}: {{ d[1] }}</li>
{%- endfor %}
</ul>
{%- endif %}
<p><a href="/mops/{{ dbname }}/{{ kind }}/{{ subject_id }}">internal</a> | <a href="/public/{{ dbname }}/{{ kind }}/{{ subject_id }}">external</a></p>"#;

/// Salient orbital parameters shown in messages and subject lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementsContext {
    /// Semi-major axis; `None` when the orbit is unbound.
    pub a: Option<f64>,
    pub e: f64,
    pub q: f64,
    pub i: f64,
    /// Absolute magnitude; `None` when the orbit has none.
    pub h: Option<f64>,
}

impl ElementsContext {
    pub fn from_orbit(orbit: &Orbit) -> Self {
        Self {
            a: orbit.semi_major_axis(),
            e: orbit.e,
            q: orbit.q,
            i: orbit.i,
            h: orbit.h_v,
        }
    }

    /// Compact bracketed summary, e.g. `[a=6.667,e=0.100,q=6.000,i=10.000,H=12.000]`.
    pub fn summary(&self) -> String {
        let a = match self.a {
            Some(a) => format!("{:.3}", a),
            None => "inf".to_string(),
        };
        let h = match self.h {
            Some(h) => format!("{:.3}", h),
            None => "-".to_string(),
        };
        format!(
            "[a={},e={:.3},q={:.3},i={:.3},H={}]",
            a, self.e, self.q, self.i, h
        )
    }
}

/// Everything the message template can reference.
#[derive(Debug, Clone, Serialize)]
pub struct MessageContext {
    pub headline: String,
    pub dbname: String,
    /// Path segment for links: `derivedobject` or `tracklet`.
    pub kind: &'static str,
    pub subject_id: i64,
    pub elements: Option<ElementsContext>,
    /// Extra labelled rows (designation, velocity, digest, ...).
    pub details: Vec<(String, String)>,
}

impl MessageContext {
    pub fn new(headline: impl Into<String>, dbname: &str, kind: SubjectKind, subject_id: i64) -> Self {
        Self {
            headline: headline.into(),
            dbname: dbname.to_string(),
            kind: match kind {
                SubjectKind::Derived => "derivedobject",
                SubjectKind::Tracklet => "tracklet",
            },
            subject_id,
            elements: None,
            details: Vec::new(),
        }
    }

    pub fn with_elements(mut self, elements: ElementsContext) -> Self {
        self.elements = Some(elements);
        self
    }

    pub fn with_detail(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((label.into(), value.into()));
        self
    }
}

/// Renders alert messages using minijinja.
pub struct MessageRenderer {
    env: minijinja::Environment<'static>,
}

impl MessageRenderer {
    /// Build the renderer and compile the message template.
    pub fn new() -> Result<Self, NotifyError> {
        let mut env = minijinja::Environment::new();
        env.add_filter("round", round_filter);
        env.add_template(MESSAGE_TEMPLATE_NAME, MESSAGE_TEMPLATE)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(Self { env })
    }

    /// Render the HTML message for one match.
    pub fn render(&self, ctx: &MessageContext) -> Result<String, NotifyError> {
        self.env
            .get_template(MESSAGE_TEMPLATE_NAME)
            .and_then(|t| t.render(ctx))
            .map_err(|e| NotifyError::Template(e.to_string()))
    }
}

/// Custom filter: format a float with N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centaur() -> ElementsContext {
        ElementsContext::from_orbit(&Orbit::from_elements(6.0, 0.1, 10.0, 12.0))
    }

    #[test]
    fn summary_uses_three_decimals() {
        assert_eq!(
            centaur().summary(),
            "[a=6.667,e=0.100,q=6.000,i=10.000,H=12.000]"
        );
    }

    #[test]
    fn summary_marks_unbound_axis() {
        let ctx = ElementsContext::from_orbit(&Orbit::from_elements(1.2, 1.5, 40.0, 18.0));
        assert!(ctx.summary().starts_with("[a=inf,e=1.500"));
    }

    #[test]
    fn missing_magnitude_renders_dash() {
        let mut orbit = Orbit::from_elements(6.0, 0.1, 10.0, 12.0);
        orbit.h_v = None;
        let elements = ElementsContext::from_orbit(&orbit);
        assert_eq!(elements.summary(), "[a=6.667,e=0.100,q=6.000,i=10.000,H=-]");

        let renderer = MessageRenderer::new().unwrap();
        let ctx = MessageContext::new("Centaur", "mops", SubjectKind::Derived, 5)
            .with_elements(elements);
        let html = renderer.render(&ctx).unwrap();
        assert!(html.contains("<td>H</td><td>-</td>"));
        assert!(!html.contains("NaN"));
    }

    #[test]
    fn render_includes_elements_and_links() {
        let renderer = MessageRenderer::new().unwrap();
        let ctx = MessageContext::new("Centaur", "mops_night", SubjectKind::Derived, 17)
            .with_elements(centaur());
        let html = renderer.render(&ctx).unwrap();

        assert!(html.contains("<b>Centaur</b>"));
        assert!(html.contains("6.667 AU"));
        assert!(html.contains("10.000 deg"));
        assert!(html.contains(r#"href="/mops/mops_night/derivedobject/17""#));
        assert!(html.contains(r#"href="/public/mops_night/derivedobject/17""#));
    }

    #[test]
    fn render_escapes_untrusted_fields() {
        let renderer = MessageRenderer::new().unwrap();
        let ctx = MessageContext::new("Known Object", "db<script>", SubjectKind::Tracklet, 3)
            .with_detail("designation", "<b>1990 KN1</b>");
        let html = renderer.render(&ctx).unwrap();

        assert!(!html.contains("<script>"));
        assert!(html.contains("db&lt;script&gt;"));
        assert!(html.contains("&lt;b&gt;1990 KN1&lt;"));
        assert!(html.contains("/tracklet/3"));
    }

    #[test]
    fn render_unbound_orbit_shows_inf() {
        let renderer = MessageRenderer::new().unwrap();
        let ctx = MessageContext::new("Hyperbolic", "mops", SubjectKind::Derived, 1)
            .with_elements(ElementsContext::from_orbit(&Orbit::from_elements(1.0, 1.2, 5.0, 20.0)));
        let html = renderer.render(&ctx).unwrap();
        assert!(html.contains("inf AU"));
        assert!(html.contains("1.200"));
    }
}
