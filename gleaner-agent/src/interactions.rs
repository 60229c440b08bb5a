use crate::job::Interaction;
use gleaner_drivers::BrowserCapabilities;
use std::time::Duration;

/// Apply `interactions` in order. Failures never stop the sequence; each one
/// becomes a warning string in the returned list.
pub async fn run_interactions<B>(interactions: &[Interaction], session: &mut B) -> Vec<String>
where
    B: BrowserCapabilities + ?Sized,
{
    let mut warnings = Vec::new();

    for (idx, interaction) in interactions.iter().enumerate() {
        match interaction {
            Interaction::Click { selector } => match session.click(selector).await {
                Ok(()) => tracing::info!(step = idx, %selector, "interaction.click"),
                Err(e) => {
                    let msg = format!("click on '{selector}' failed: {e}");
                    tracing::warn!(step = idx, error = %e, "interaction.click.failed");
                    warnings.push(msg);
                }
            },
            Interaction::Wait { duration } => {
                tokio::time::sleep(Duration::from_millis(*duration)).await;
                tracing::info!(step = idx, duration_ms = duration, "interaction.wait");
            }
            Interaction::Fill { selector, value } => {
                match session.fill(selector, value).await {
                    Ok(()) => tracing::info!(step = idx, %selector, "interaction.fill"),
                    Err(e) => {
                        let msg = format!("fill of '{selector}' failed: {e}");
                        tracing::warn!(step = idx, error = %e, "interaction.fill.failed");
                        warnings.push(msg);
                    }
                }
            }
            Interaction::Scroll { direction } => {
                tracing::warn!(step = idx, %direction, "interaction.scroll.unsupported");
                warnings.push(format!("scroll ({direction}) is not supported; skipped"));
            }
        }
    }

    warnings
}
