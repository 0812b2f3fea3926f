//! The "expand everything" interaction script.
//!
//! Best-effort and lossy: it clicks collapsed toggles, opens `<details>`,
//! clicks "N components" badges and strips `hidden`/`collapsed` classes. It runs
//! a fixed number of passes because expanding a group can reveal further
//! collapsed children. A failing pass never fails the render.

use super::{RenderAction, ScrollDirection};
use crate::config::PipelineConfig;

/// DOM expansion script. Returns the number of elements it touched.
pub const EXPAND_SCRIPT: &str = r#"(() => {
  let touched = 0;
  const safeClick = (el) => { try { el.click(); touched++; } catch (e) {} };
  document.querySelectorAll('[aria-expanded="false"]').forEach(safeClick);
  document.querySelectorAll('details:not([open])').forEach((el) => { el.open = true; touched++; });
  document.querySelectorAll('button, a, span, div, summary').forEach((el) => {
    const text = (el.textContent || '').trim();
    if (text.length > 0 && text.length < 40 && /\d+\s*components?/i.test(text)) { safeClick(el); }
  });
  document.querySelectorAll('.hidden, .collapsed').forEach((el) => {
    el.classList.remove('hidden');
    el.classList.remove('collapsed');
    touched++;
  });
  return touched;
})()"#;

/// Scroll to bottom and back to trigger lazy content, then run the expansion
/// script `passes` times with a wait after each pass.
pub fn interaction_plan(settle_ms: u64, passes: u32, pass_wait_ms: u64) -> Vec<RenderAction> {
    let mut actions = vec![
        RenderAction::Wait {
            milliseconds: settle_ms,
        },
        RenderAction::Scroll {
            direction: ScrollDirection::Down,
        },
        RenderAction::Wait { milliseconds: 500 },
        RenderAction::Scroll {
            direction: ScrollDirection::Up,
        },
    ];
    for _ in 0..passes {
        actions.push(RenderAction::ExecuteJavascript {
            script: EXPAND_SCRIPT.to_string(),
        });
        actions.push(RenderAction::Wait {
            milliseconds: pass_wait_ms,
        });
    }
    actions
}

/// The plan for a given pipeline configuration.
pub fn plan_for(config: &PipelineConfig) -> Vec<RenderAction> {
    interaction_plan(
        config.render_settle_ms,
        config.expansion_passes,
        config.expansion_wait_ms,
    )
}
