//! Quest calls: render, dispatch, cast the spell, merge into the bundle

use std::collections::BTreeMap;

use crate::data::{Adventure, Bundle, Quest};

use super::dispatch::{Dispatcher, RenderedRequest, Response};
use super::error::QuestError;
use super::spell::{Spell, SpellError};
use super::template;

/// What happened to the bundle after the response came back
#[derive(Debug)]
pub enum SpellOutcome {
    /// The quest has no spell; the bundle is untouched
    Skipped,
    /// The spell ran and these items were merged into the bundle
    Applied(BTreeMap<String, String>),
    /// The spell failed; the bundle is untouched
    Failed(QuestError),
}

/// Result of a completed quest call
#[derive(Debug)]
pub struct CallOutcome {
    pub request: RenderedRequest,
    pub response: Response,
    pub spell: SpellOutcome,
}

impl CallOutcome {
    /// Raw response body
    pub fn body(&self) -> &[u8] {
        &self.response.body
    }

    pub fn spell_error(&self) -> Option<&QuestError> {
        match &self.spell {
            SpellOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Runs quests against a bundle through a dispatcher
pub struct Orchestrator<D> {
    dispatcher: D,
}

impl<D: Dispatcher> Orchestrator<D> {
    pub fn new(dispatcher: D) -> Self {
        Self { dispatcher }
    }

    /// Call a quest, merging its spell output into `bundle`.
    ///
    /// Render and dispatch failures are returned as errors with the bundle
    /// untouched. A spell failure is reported in [`CallOutcome::spell`] so
    /// the response is never lost.
    pub async fn call(
        &self,
        quest: &Quest,
        bundle: &mut Bundle,
    ) -> Result<CallOutcome, QuestError> {
        let request = render(quest, bundle)?;

        tracing::info!(
            quest = %quest.name,
            method = %request.method,
            url = %request.url,
            "Dispatching quest"
        );
        let response = self.dispatcher.dispatch(&request).await?;
        tracing::info!(
            quest = %quest.name,
            status = response.status,
            bytes = response.body.len(),
            "Quest answered"
        );

        let spell = match &quest.spell {
            None => SpellOutcome::Skipped,
            Some(source) => match cast(source, &response) {
                Ok(output) => {
                    tracing::debug!(
                        quest = %quest.name,
                        keys = ?output.keys().collect::<Vec<_>>(),
                        "Merging spell output into bundle"
                    );
                    bundle.merge(output.clone());
                    SpellOutcome::Applied(output)
                }
                Err(spell_err) => {
                    let err = QuestError::TransformExecution {
                        quest: quest.name.clone(),
                        source: spell_err,
                    };
                    tracing::warn!(
                        quest = %quest.name,
                        error = %err,
                        "Spell failed; bundle not updated"
                    );
                    SpellOutcome::Failed(err)
                }
            },
        };

        Ok(CallOutcome {
            request,
            response,
            spell,
        })
    }

    /// Look up a quest by name in the adventure and call it with the
    /// adventure's bundle. The first quest with a matching name wins.
    pub async fn call_by_name(
        &self,
        adventure: &mut Adventure,
        name: &str,
    ) -> Result<CallOutcome, QuestError> {
        let Adventure {
            name: adventure_name,
            quests,
            bundle,
            ..
        } = adventure;
        let quest = quests
            .iter()
            .find(|quest| quest.name == name)
            .ok_or_else(|| QuestError::QuestNotFound {
                adventure: adventure_name.clone(),
                quest: name.to_string(),
            })?;
        self.call(quest, bundle).await
    }
}

/// Render a quest's templates against the bundle and validate the result.
///
/// The method is sent in ASCII uppercase, so `get` goes out as `GET`.
pub fn render(quest: &Quest, bundle: &Bundle) -> Result<RenderedRequest, QuestError> {
    let vars = &bundle.items;
    let request = RenderedRequest {
        method: quest.method.to_ascii_uppercase(),
        url: template::render(&quest.url, vars)?,
        data: quest
            .data
            .as_ref()
            .map(|data| template::render_map("data", data, vars))
            .transpose()?,
        headers: quest
            .headers
            .as_ref()
            .map(|headers| template::render_map("headers", headers, vars))
            .transpose()?,
    };
    request.validate()?;
    Ok(request)
}

fn cast(source: &str, response: &Response) -> Result<BTreeMap<String, String>, SpellError> {
    Spell::parse(source)?.cast(response)
}
