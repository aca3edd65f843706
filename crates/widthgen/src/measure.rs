//! Width measurement through a browser's canvas `measureText()`.

use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use widthgen_cdp::Connection;

pub const DEFAULT_FONT: &str = "12px Arial";

/// Measures the symmetrized incremental width of every character in a sequence.
///
/// Implementations are shared by all pool workers and may be called concurrently.
#[async_trait]
pub trait Measurer: Send + Sync {
    async fn measure(&self, codes: &[u32]) -> Result<Vec<f64>>;
}

/// Installs `window.mtcontext`, a 2D canvas context using `font`, in the page.
pub fn setup_script(font: &str) -> String {
    let font = serde_json::Value::from(font).to_string();
    format!(
        "Promise.resolve((window.mtcontext = document.createElement('canvas').getContext('2d'), \
         window.mtcontext.font = {font}, true));"
    )
}

/// Measures `codes` forwards and backwards with `window.mtcontext` and resolves to the
/// position-wise mean of the two incremental width sequences.
///
/// The backward pass runs over the reversed codes and stays in scan order, so entry `i` of
/// the result averages the `i`-th step of each pass.
pub fn measure_script(codes: &[u32]) -> String {
    let codes = serde_json::Value::from(codes.to_vec()).to_string();
    format!(
        r#"Promise.resolve((function(chars) {{
  var ctx = window.mtcontext;
  var incremental = function(chars) {{
    var str = '';
    var lastWidth = 0;
    return chars.map(function(ch) {{
      str += String.fromCharCode(ch);
      var w = ctx.measureText(str).width;
      var delta = w - lastWidth;
      lastWidth = w;
      return delta;
    }});
  }};
  var forw = incremental(chars);
  var back = incremental(chars.slice().reverse());
  return forw.map(function(x, i) {{ return (x + back[i]) / 2; }});
}})({codes}));"#
    )
}

/// [`Measurer`] backed by one shared DevTools page connection.
pub struct CanvasMeasurer {
    conn: Arc<Connection>,
}

impl CanvasMeasurer {
    /// Finds the first page at `host`, attaches to it and installs the measuring context.
    pub async fn connect(host: &str, font: &str) -> Result<Self> {
        let page = widthgen_cdp::find_page(host)
            .await
            .map_err(Error::Discovery)?;
        let ws_url = page
            .web_socket_debugger_url
            .ok_or(Error::Discovery(widthgen_cdp::Error::NoPage))?;
        info!(page = %page.id, title = %page.title, "attaching to page");
        let conn = Connection::connect(&ws_url)
            .await
            .map_err(|source| Error::Connect {
                url: ws_url.clone(),
                source,
            })?;
        Self::setup(Arc::new(conn), font).await
    }

    /// Runs the one-time canvas setup on an existing connection.
    pub async fn setup(conn: Arc<Connection>, font: &str) -> Result<Self> {
        let installed: bool = conn
            .eval_promise(&setup_script(font))
            .await
            .map_err(Error::Setup)?;
        if !installed {
            return Err(Error::Setup(widthgen_cdp::Error::Evaluation(
                "setup script resolved to false".to_string(),
            )));
        }
        debug!(font, "canvas context ready");
        Ok(Self { conn })
    }

    pub async fn close(&self) {
        self.conn.close().await;
    }
}

#[async_trait]
impl Measurer for CanvasMeasurer {
    async fn measure(&self, codes: &[u32]) -> Result<Vec<f64>> {
        self.conn
            .eval_promise(&measure_script(codes))
            .await
            .map_err(Error::Measure)
    }
}
