use crate::processing::InfoBox;
use crate::render::html_escape;

const JQUERY_UI_CSS: &str = "https://code.jquery.com/ui/1.12.1/themes/base/jquery-ui.css";
const JQUERY_JS: &str = "https://code.jquery.com/jquery-1.12.4.js";
const JQUERY_UI_JS: &str = "https://code.jquery.com/ui/1.12.1/jquery-ui.js";

pub fn render_head(info: &InfoBox) -> String {
    let mut head = String::new();
    if info.draggable {
        head.push_str(&format!(
            r##"
    <link rel="stylesheet" href="{css}"/>
    <script src="{jquery}"></script>
    <script src="{jquery_ui}"></script>
    <script>
    $( function() {{
        $( "#textbox" ).draggable({{
            start: function (event, ui) {{
                $(this).css({{
                    right: "auto",
                    top: "auto",
                    bottom: "auto"
                }});
            }}
        }});
    }});
    </script>"##,
            css = JQUERY_UI_CSS,
            jquery = JQUERY_JS,
            jquery_ui = JQUERY_UI_JS,
        ));
    }
    head.push_str(&format!("\n    <style type='text/css'>{}</style>", textbox_css()));
    head
}

pub fn render_body(info: &InfoBox) -> String {
    let logo = info
        .logo_url
        .as_deref()
        .map(|url| {
            format!(
                r#"
    <div class="textbox-logo">
        <img src="{url}" alt="Logo" style="width: 250px; height: auto;">
    </div>"#,
                url = html_escape(url),
            )
        })
        .unwrap_or_default();

    format!(
        r#"
    <div id="textbox" class="textbox">
        <div class="textbox-title">{title}</div>
        <div class="textbox-content">
            <pre>{body}</pre>
        </div>
    </div>{logo}"#,
        title = html_escape(&info.title),
        body = html_escape(&info.body),
        logo = logo,
    )
}

fn textbox_css() -> &'static str {
    r#"
    .textbox {
        position: absolute;
        z-index: 9999;
        border-radius: 4px;
        background: rgba(90, 114, 71, 0.25);
        box-shadow: 0 8px 32px 0 rgba(90, 114, 71, 0.37);
        backdrop-filter: blur(4px);
        -webkit-backdrop-filter: blur(4px);
        border: 4px solid rgba(90, 114, 71, 0.2);
        padding: 10px;
        font-size: 14px;
        right: 20px;
        bottom: 20px;
        color: #5a7247;
    }
    .textbox .textbox-title {
        color: black;
        text-align: center;
        margin-bottom: 5px;
        font-weight: bold;
        font-size: 22px;
    }
    .textbox .textbox-content {
        color: black;
        text-align: left;
        margin-bottom: 5px;
        font-size: 14px;
    }
    .textbox-logo {
        position: fixed;
        top: 10px;
        left: 50px;
        width: 250px;
        height: 80px;
        z-index: 9999;
        text-align: center;
    }
    "#
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(draggable: bool) -> InfoBox {
        InfoBox {
            title: "Winterweizen Phänologie".to_string(),
            body: "Auflauf <BBCH 09> & Ährenschieben".to_string(),
            logo_url: Some("https://example.org/logo.png".to_string()),
            draggable,
        }
    }

    #[test]
    fn draggable_box_pulls_in_jquery_ui() {
        let head = render_head(&info(true));
        assert!(head.contains(JQUERY_UI_JS));
        assert!(head.contains(r##"$( "#textbox" ).draggable({"##));
        assert!(head.contains(r#"right: "auto","#));
        assert!(head.contains(".textbox {"));
    }

    #[test]
    fn static_box_has_no_scripts() {
        let head = render_head(&info(false));
        assert!(!head.contains("<script"));
        assert!(head.contains(".textbox {"));
    }

    #[test]
    fn body_escapes_text() {
        let body = render_body(&info(false));
        assert!(body.contains("Auflauf &lt;BBCH 09&gt; &amp; Ährenschieben"));
        assert!(body.contains(r#"<img src="https://example.org/logo.png""#));

        let no_logo = render_body(&InfoBox { logo_url: None, ..info(false) });
        assert!(!no_logo.contains("<img"));
    }
}
