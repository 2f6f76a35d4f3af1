use crate::config::RadioConfig;
use crate::dom::NodeId;
use crate::events::Binding;
use crate::page::Page;
use crate::Result;

pub(super) fn bind(config: &RadioConfig, page: &mut Page) -> Result<()> {
    for radio in page.select_all(&config.radio_selector)? {
        if let Some(panel) = panel_for(config, page, radio) {
            let checked = page.checked(radio);
            page.set_displayed(panel, checked)?;
            let line = format!(
                "[radio] init {} panel={} show={checked}",
                page.label(radio),
                page.label(panel)
            );
            page.trace_line(line);
        }
        page.bind(radio, "click", Binding::RadioPanelClick);
    }
    Ok(())
}

/// The detail panel paired with `radio`: the element right after the radio's
/// parent, provided it carries the panel class.
fn panel_for(config: &RadioConfig, page: &Page, radio: NodeId) -> Option<NodeId> {
    let parent = page.dom.parent(radio)?;
    let next = page.dom.next_element_sibling(parent)?;
    page.dom
        .class_contains(next, &config.panel_class)
        .then_some(next)
}

pub(super) fn on_click(config: &RadioConfig, page: &mut Page, radio: NodeId) -> Result<()> {
    let Some(panel) = panel_for(config, page, radio) else {
        return Ok(());
    };
    let position = page.dom.element_position(panel);
    if position != Some(config.designated_index) {
        let line = format!(
            "[radio] click {} panel={} at {position:?} ignored",
            page.label(radio),
            page.label(panel)
        );
        page.trace_line(line);
        return Ok(());
    }

    for other in page.elements_with_class(&config.panel_class) {
        page.set_displayed(other, false)?;
    }
    page.set_displayed(panel, true)?;
    let line = format!(
        "[radio] click {} shows only {}",
        page.label(radio),
        page.label(panel)
    );
    page.trace_line(line);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie::CookieJar;
    use crate::html::parse_html;
    use crate::location::LocationParts;
    use crate::Error;

    const OPTIONS: &str = r#"
        <fieldset>
          <div class="multiple-choice"><input id="r1" type="radio" name="q" checked></div>
          <div id="p1" class="additional-option-block">one</div>
        </fieldset>
        <fieldset>
          <div class="multiple-choice"><input id="r2" type="radio" name="q"></div>
          <div id="p2" class="additional-option-block">two</div>
        </fieldset>
        <fieldset>
          <div class="multiple-choice"><input id="r3" type="radio" name="q" checked></div>
          <div id="p3" class="additional-option-block">three</div>
        </fieldset>
        <fieldset>
          <div class="multiple-choice"><input id="r4" type="radio" name="other"></div>
          <p>no panel</p>
        </fieldset>
    "#;

    fn ready(html: &str) -> Result<Page> {
        let mut page = Page::new(
            parse_html(html)?,
            LocationParts::parse("https://app.local/")?,
            CookieJar::new(),
            0,
        );
        bind(&RadioConfig::default(), &mut page)?;
        Ok(page)
    }

    fn visible(page: &Page, id: &str) -> Result<bool> {
        let node = page
            .dom
            .by_id(id)
            .ok_or_else(|| Error::SelectorNotFound(format!("#{id}")))?;
        Ok(page.is_visible(node))
    }

    #[test]
    fn initial_visibility_mirrors_each_radio() -> Result<()> {
        let page = ready(OPTIONS)?;
        assert!(visible(&page, "p1")?);
        assert!(!visible(&page, "p2")?);
        assert!(visible(&page, "p3")?);
        Ok(())
    }

    #[test]
    fn click_at_designated_index_leaves_one_panel() -> Result<()> {
        let mut page = ready(OPTIONS)?;
        let r2 = page.dom.by_id("r2").ok_or(Error::SelectorNotFound("#r2".into()))?;
        on_click(&RadioConfig::default(), &mut page, r2)?;
        assert!(!visible(&page, "p1")?);
        assert!(visible(&page, "p2")?);
        assert!(!visible(&page, "p3")?);
        Ok(())
    }

    #[test]
    fn panel_outside_designated_index_is_ignored() -> Result<()> {
        let config = RadioConfig {
            designated_index: 0,
            ..RadioConfig::default()
        };
        let mut page = ready(OPTIONS)?;
        let r2 = page.dom.by_id("r2").ok_or(Error::SelectorNotFound("#r2".into()))?;
        on_click(&config, &mut page, r2)?;
        assert!(visible(&page, "p1")?);
        assert!(!visible(&page, "p2")?);
        assert!(visible(&page, "p3")?);
        Ok(())
    }

    #[test]
    fn panel_requires_the_panel_class() -> Result<()> {
        let page = ready(OPTIONS)?;
        let r4 = page.dom.by_id("r4").ok_or(Error::SelectorNotFound("#r4".into()))?;
        assert_eq!(panel_for(&RadioConfig::default(), &page, r4), None);
        Ok(())
    }
}
