use crate::capabilities::ScriptProvider;
use crate::topic::Topic;
use crate::{logok, logw};

/// Deterministic narration used whenever generation fails.
pub fn script_from_template(topic: &Topic) -> String {
    format!(
        "Today’s survival tip: {}. Store at least one gallon of water per person per day, \
         keep shelf-stable food and a manual can opener, and use battery lanterns for safe indoor light. \
         Carry a NOAA weather radio and a charged power bank for phones. \
         Pack a compact first-aid kit with a trauma bandage and gloves. \
         Simple steps done now make a stressful situation safer and easier.",
        topic
    )
}

/// Asks the provider for a script and falls back to the template on any failure.
/// Never returns an empty script.
pub async fn write_script(provider: &dyn ScriptProvider, topic: &Topic) -> String {
    match provider.generate(topic).await {
        Ok(text) if !text.trim().is_empty() => {
            let text = text.trim().to_string();
            logok(format!(
                "Generated script ({} words)",
                text.split_whitespace().count()
            ));
            text
        }
        Ok(_) => {
            logw("Script generation returned nothing; using template.");
            script_from_template(topic)
        }
        Err(err) => {
            logw(format!("Script generation failed ({:#}); using template.", err));
            script_from_template(topic)
        }
    }
}
