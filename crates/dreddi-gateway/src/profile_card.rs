use askama::Template;
use dreddi_platform::PublicProfileResponse;

#[derive(Template)]
#[template(
    ext = "html",
    source = r#"<!doctype html><html lang="{{ lang }}"><head><meta charset="utf-8"><title>{{ title }}</title></head><body><main class="profile"><h1>{{ title }}</h1>{% if let Some(subtitle) = subtitle %}<p class="subtitle">{{ subtitle }}</p>{% endif %}{% if has_history %}<p class="score" data-score="{{ score }}">{{ score_display }}</p>{% else %}<p class="score" data-score="none">&mdash;</p>{% endif %}</main></body></html>"#
)]
struct ProfileCard<'a> {
    lang: &'a str,
    title: &'a str,
    subtitle: Option<&'a str>,
    has_history: bool,
    score: String,
    score_display: &'a str,
}

/// Server-rendered public profile card; all profile text is HTML-escaped.
pub fn render(profile: &PublicProfileResponse) -> askama::Result<String> {
    ProfileCard {
        lang: profile.locale.as_str(),
        title: &profile.identity.title,
        subtitle: profile.identity.subtitle.as_deref(),
        has_history: profile.has_history,
        score: profile.score.to_string(),
        score_display: &profile.score_display,
    }
    .render()
}

#[cfg(test)]
mod tests {
    use dreddi_core::{Locale, ProfileIdentity, ReputationCounts};
    use rust_decimal::Decimal;

    use super::*;

    fn profile(title: &str, counts: ReputationCounts) -> PublicProfileResponse {
        PublicProfileResponse {
            handle: "jane99".to_string(),
            identity: ProfileIdentity {
                title: title.to_string(),
                subtitle: Some("@jane99".to_string()),
            },
            counts,
            has_history: counts.has_history(),
            score: counts.score(),
            score_display: "1,5".to_string(),
            locale: Locale::Uk,
        }
    }

    #[test]
    fn renders_score_when_there_is_history() {
        let page = render(&profile("Jane", ReputationCounts::new(1, 1, 0))).unwrap();
        assert!(page.contains("lang=\"uk\""));
        assert!(page.contains("<h1>Jane</h1>"));
        assert!(page.contains("<p class=\"subtitle\">@jane99</p>"));
        assert!(page.contains(&format!("data-score=\"{}\"", Decimal::new(15, 1))));
        assert!(page.contains(">1,5</p>"));
    }

    #[test]
    fn profile_text_is_escaped() {
        let page = render(&profile("<script>x</script>", ReputationCounts::default())).unwrap();
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(page.contains("data-score=\"none\""));
    }
}
