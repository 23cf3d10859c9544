use crate::case::Parameters;
use crate::context::{RequestContext, ViewRoot};
use crate::error::NavigationError;
use ahash::{AHashMap, AHashSet};
use std::io;
use std::sync::Mutex;
use tracing::debug;
use url::form_urlencoded;

/// Creates views and turns view ids into client URLs.
pub trait ViewHandler: Send + Sync {
    fn create_view(&self, ctx: &RequestContext, view_id: &str) -> Result<ViewRoot, NavigationError>;

    /// Maps a candidate view id to an existing view, or `None` when no such view exists.
    fn derive_view_id(&self, ctx: &RequestContext, view_id: &str) -> Option<String>;

    fn redirect_url(
        &self,
        ctx: &RequestContext,
        view_id: &str,
        parameters: &Parameters,
        include_view_params: bool,
    ) -> String;
}

/// Issues client redirects.
pub trait ExternalContext: Send + Sync {
    fn redirect(&self, url: &str) -> io::Result<()>;
}

/// A view handler over an optional whitelist of known views.
///
/// Without a whitelist every view id is considered to exist.
#[derive(Debug, Clone, Default)]
pub struct DefaultViewHandler {
    context_path: String,
    known_views: Option<AHashSet<String>>,
    view_parameters: AHashMap<String, Vec<(String, String)>>,
}

impl DefaultViewHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into().trim_end_matches('/').to_string();
        self
    }

    /// Restricts derivable view ids to those registered here.
    pub fn with_view(mut self, view_id: impl Into<String>) -> Self {
        self.known_views
            .get_or_insert_with(AHashSet::new)
            .insert(view_id.into());
        self
    }

    pub fn with_views<I, S>(self, view_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        view_ids.into_iter().fold(self, |h, v| h.with_view(v))
    }

    /// Declares a view parameter carried into redirects that include view params.
    pub fn with_view_parameter(
        mut self,
        view_id: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.view_parameters
            .entry(view_id.into())
            .or_default()
            .push((name.into(), value.into()));
        self
    }
}

impl ViewHandler for DefaultViewHandler {
    fn create_view(&self, _ctx: &RequestContext, view_id: &str) -> Result<ViewRoot, NavigationError> {
        if let Some(known) = &self.known_views {
            if !known.contains(view_id) {
                return Err(NavigationError::ViewCreation {
                    view_id: view_id.to_string(),
                    message: "no such view".to_string(),
                });
            }
        }
        Ok(ViewRoot::new(view_id))
    }

    fn derive_view_id(&self, _ctx: &RequestContext, view_id: &str) -> Option<String> {
        match &self.known_views {
            Some(known) if !known.contains(view_id) => None,
            _ => Some(view_id.to_string()),
        }
    }

    fn redirect_url(
        &self,
        _ctx: &RequestContext,
        view_id: &str,
        parameters: &Parameters,
        include_view_params: bool,
    ) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (name, value) in parameters.pairs() {
            query.append_pair(name, value);
        }
        if include_view_params {
            for (name, value) in self.view_parameters.get(view_id).into_iter().flatten() {
                if !parameters.contains(name) {
                    query.append_pair(name, value);
                }
            }
        }
        let query = query.finish();

        let url = if query.is_empty() {
            format!("{}{}", self.context_path, view_id)
        } else {
            format!("{}{}?{}", self.context_path, view_id, query)
        };
        debug!(view_id, url = %url, "Computed redirect URL");
        url
    }
}

/// An external context that records every redirect instead of writing a response.
#[derive(Debug, Default)]
pub struct CapturingExternalContext {
    redirects: Mutex<Vec<String>>,
}

impl CapturingExternalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl ExternalContext for CapturingExternalContext {
    fn redirect(&self, url: &str) -> io::Result<()> {
        self.redirects
            .lock()
            .map_err(|_| io::Error::other("redirect log poisoned"))?
            .push(url.to_string());
        Ok(())
    }
}
