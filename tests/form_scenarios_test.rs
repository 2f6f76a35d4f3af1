use form_view_state::{ControllerConfig, Harness, Result};

const OWNERSHIP_PAGE: &str = r#"
    <form method="POST" action="/calculate-your-capital-gains/resident/shares/owner-before-legislation-start">
      <fieldset class="form-group inline" data-hidden>
        <legend>Did you own the shares before 1 April 1982?</legend>
        <div class="multiple-choice">
          <input id="before-yes" type="radio" name="ownedBefore" value="Yes" checked>
          <label for="before-yes">Yes</label>
        </div>
        <div class="multiple-choice">
          <input id="before-no" type="radio" name="ownedBefore" value="No">
          <label for="before-no">No</label>
        </div>
      </fieldset>
      <div id="hidden" class="panel panel-border-narrow">
        <label for="valueBefore">Value on 31 March 1982</label>
        <input id="valueBefore" type="text" name="valueBefore">
      </div>
      <button id="continue" type="submit">Continue</button>
    </form>
"#;

const DISPOSAL_PAGE: &str = r#"
    <form>
      <fieldset>
        <legend>How did you dispose of the shares?</legend>
        <div class="form-group">
          <div class="multiple-choice">
            <input id="sold" type="radio" name="disposal" value="sold">
          </div>
          <div id="sold-panel" class="additional-option-block">Enter the sale price</div>
        </div>
        <div class="form-group">
          <div class="multiple-choice">
            <input id="gifted" type="radio" name="disposal" value="gifted" checked>
          </div>
          <div id="gifted-panel" class="additional-option-block">Enter the market value</div>
        </div>
        <div class="form-group">
          <div class="multiple-choice">
            <input id="other" type="radio" name="disposal" value="other">
          </div>
          <div id="other-panel" class="additional-option-block">Describe the disposal</div>
        </div>
      </fieldset>
    </form>
"#;

#[test]
fn checked_yes_at_load_shows_the_region() -> Result<()> {
    let harness = Harness::from_html(OWNERSHIP_PAGE)?;
    harness.assert_visible("#hidden", true)?;
    harness.assert_checked("#before-yes", true)?;
    Ok(())
}

#[test]
fn no_at_load_hides_the_region() -> Result<()> {
    let html = OWNERSHIP_PAGE
        .replace(r#"value="Yes" checked"#, r#"value="Yes""#)
        .replace(r#"value="No">"#, r#"value="No" checked>"#);
    let harness = Harness::from_html(&html)?;
    harness.assert_visible("#hidden", false)?;
    Ok(())
}

#[test]
fn answering_the_question_toggles_the_follow_up() -> Result<()> {
    let mut harness = Harness::from_html(OWNERSHIP_PAGE)?;
    harness.click("#before-no")?;
    harness.assert_checked("#before-yes", false)?;
    harness.assert_visible("#hidden", false)?;

    harness.type_text("#valueBefore", "12000")?;
    harness.click("#before-yes")?;
    harness.assert_visible("#hidden", true)?;
    harness.assert_value("#valueBefore", "12000")?;
    Ok(())
}

#[test]
fn hidden_region_keeps_other_inline_styles() -> Result<()> {
    let html = OWNERSHIP_PAGE.replace(
        r#"<div id="hidden" class="panel panel-border-narrow">"#,
        r#"<div id="hidden" class="panel panel-border-narrow" style="margin-top: 10px">"#,
    );
    let mut harness = Harness::from_html(&html)?;
    harness.click("#before-no")?;
    let dumped = harness.dump_dom("#hidden")?;
    assert!(dumped.contains("margin-top: 10px"), "{dumped}");
    assert!(dumped.contains("display: none"), "{dumped}");

    harness.click("#before-yes")?;
    let dumped = harness.dump_dom("#hidden")?;
    assert!(dumped.contains("margin-top: 10px"), "{dumped}");
    assert!(!dumped.contains("display: none"), "{dumped}");
    Ok(())
}

#[test]
fn checked_option_panel_is_the_only_one_shown_at_load() -> Result<()> {
    let harness = Harness::from_html(DISPOSAL_PAGE)?;
    harness.assert_visible("#sold-panel", false)?;
    harness.assert_visible("#gifted-panel", true)?;
    harness.assert_visible("#other-panel", false)?;
    Ok(())
}

#[test]
fn clicking_an_option_shows_only_its_panel() -> Result<()> {
    let mut harness = Harness::from_html(DISPOSAL_PAGE)?;
    harness.click("#other")?;
    harness.assert_visible("#sold-panel", false)?;
    harness.assert_visible("#gifted-panel", false)?;
    harness.assert_visible("#other-panel", true)?;

    harness.click("#sold")?;
    harness.assert_visible("#sold-panel", true)?;
    harness.assert_visible("#other-panel", false)?;
    harness.assert_checked("#other", false)?;
    Ok(())
}

#[test]
fn designated_index_can_be_configured() -> Result<()> {
    let html = DISPOSAL_PAGE.replacen(
        r#"<div class="form-group">"#,
        r#"<div class="form-group"><p class="form-hint">Most people sell</p>"#,
        1,
    );
    let config = ControllerConfig::from_json_str(r#"{ "radio": { "designated_index": 2 } }"#)?;
    let mut harness = Harness::from_html_with_config("https://app.local/", &html, config)?;

    harness.click("#sold")?;
    harness.assert_visible("#sold-panel", true)?;
    harness.assert_visible("#gifted-panel", false)?;

    // The other panels now sit outside the configured position.
    harness.click("#other")?;
    harness.assert_visible("#sold-panel", true)?;
    harness.assert_visible("#other-panel", false)?;
    Ok(())
}

#[test]
fn submit_button_click_does_not_touch_view_state() -> Result<()> {
    let mut harness = Harness::from_html(OWNERSHIP_PAGE)?;
    harness.click("#continue")?;
    harness.assert_visible("#hidden", true)?;
    assert!(harness.take_location_navigations().is_empty());
    assert!(harness.analytics_events().is_empty());
    Ok(())
}

#[test]
fn marker_without_a_matching_id_toggles_the_default_region() -> Result<()> {
    let html = OWNERSHIP_PAGE.replace("data-hidden>", r#"data-hidden="true">"#);
    let mut harness = Harness::from_html(&html)?;
    harness.assert_visible("#hidden", true)?;
    harness.click("#before-no")?;
    harness.assert_visible("#hidden", false)?;
    harness.click("#before-yes")?;
    harness.assert_visible("#hidden", true)?;
    Ok(())
}
