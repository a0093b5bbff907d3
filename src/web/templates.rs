//! Template rendering with Tera

use anyhow::Result;
use tera::{Context, Tera};

/// Template renderer with all templates embedded in the binary.
pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_template("base.html", include_str!("../templates/base.html"))?;
        tera.add_raw_template("index.html", include_str!("../templates/index.html"))?;
        tera.add_raw_template("search.html", include_str!("../templates/search.html"))?;
        tera.add_raw_template("settings.html", include_str!("../templates/settings.html"))?;
        tera.add_raw_template("stats.html", include_str!("../templates/stats.html"))?;
        tera.add_raw_template(
            "opensearch.xml",
            include_str!("../templates/opensearch.xml"),
        )?;

        Ok(Self { tera })
    }

    pub fn render(&self, template: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template, context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_templates_compile() {
        Templates::new().unwrap();
    }

    #[test]
    fn renders_the_index() {
        let t = Templates::new().unwrap();
        let mut ctx = Context::new();
        ctx.insert("base_url", "http://localhost:8080");
        ctx.insert("version", "0.0.0");

        let html = t.render("index.html", &ctx).unwrap();
        assert!(html.contains("/search"));
    }
}
