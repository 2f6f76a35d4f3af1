use crate::config::ToggleConfig;
use crate::dom::NodeId;
use crate::events::Binding;
use crate::page::Page;
use crate::Result;

pub(super) fn bind(config: &ToggleConfig, page: &mut Page) -> Result<()> {
    for block in page.select_all(&config.block_selector)? {
        let region = resolve_region(config, page, block);
        let inputs = page.select_within(block, &config.input_selector)?;

        // The first input decides the initial state. A block without inputs
        // reads as an empty, unchecked value and hides its region.
        let (value, checked) = inputs
            .first()
            .map(|input| (page.value(*input), page.checked(*input)))
            .unwrap_or_default();
        let show = value == config.affirmative_value && checked;
        match region {
            Some(region) => {
                page.set_displayed(region, show)?;
                let line = format!(
                    "[toggle] init {} region={} value={value:?} checked={checked} show={show}",
                    page.label(block),
                    page.label(region),
                );
                page.trace_line(line);
            }
            None => {
                let line = format!("[toggle] init {} has no region", page.label(block));
                page.trace_line(line);
            }
        }

        for input in inputs {
            page.bind(input, "change", Binding::ToggleChange { region });
        }
    }
    Ok(())
}

/// The region named by the block's marker attribute, or the page-wide
/// default when the attribute is empty or names no element.
fn resolve_region(config: &ToggleConfig, page: &Page, block: NodeId) -> Option<NodeId> {
    page.dom
        .attr(block, &config.block_attribute)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .and_then(|id| page.dom.by_id(&id))
        .or_else(|| page.dom.by_id(&config.default_region_id))
}

/// Only the two sentinels move the region. Any other value leaves it as is.
pub(super) fn on_change(
    config: &ToggleConfig,
    page: &mut Page,
    region: Option<NodeId>,
    input: NodeId,
) -> Result<()> {
    let Some(region) = region else {
        return Ok(());
    };
    let value = page.value(input);
    let show = if value == config.affirmative_value {
        true
    } else if value == config.negative_value {
        false
    } else {
        let line = format!(
            "[toggle] change {} value={value:?} leaves {} unchanged",
            page.label(input),
            page.label(region)
        );
        page.trace_line(line);
        return Ok(());
    };
    page.set_displayed(region, show)?;
    let line = format!(
        "[toggle] change {} value={value:?} show={show}",
        page.label(input)
    );
    page.trace_line(line);
    Ok(())
}
