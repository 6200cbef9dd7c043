//! Page-side scripts evaluated by [`super::ChromiumHost`]
//!
//! Everything lives under `window.__snippetBench` so a page can be reset by
//! re-running [`SETUP`].

use crate::error::{BenchError, Result};

/// Element id of the render target
pub const TARGET_ID: &str = "snippet-bench-target";

/// Installs the render target and the page-side warmer.
///
/// The warmer spins for `quantum` ms, then yields through a `MessageChannel`
/// (a macrotask with no timer clamping) before the next quantum. Each message
/// carries the generation that posted it, so a restart never leaves a stale
/// chain spinning alongside the new one.
pub const SETUP: &str = r#"
(() => {
    document.body.innerHTML = '';
    const target = document.createElement('div');
    target.id = 'snippet-bench-target';
    document.body.appendChild(target);

    const channel = new MessageChannel();
    const bench = {
        target,
        warm: false,
        generation: 0,
        quantum: 1,
        sink: 0,
        startWarming(quantum) {
            if (bench.warm) return;
            bench.warm = true;
            bench.quantum = quantum;
            spin(++bench.generation);
        },
        stopWarming() {
            if (!bench.warm) return;
            bench.warm = false;
            bench.generation++;
        },
    };
    const spin = (generation) => {
        if (!bench.warm || bench.generation !== generation) return;
        const end = performance.now() + bench.quantum;
        let sum = 0;
        while (performance.now() < end) sum += Math.random();
        bench.sink = sum;
        channel.port2.postMessage(generation);
    };
    channel.port1.onmessage = (event) => spin(event.data);
    window.__snippetBench = bench;
    return true;
})()
"#;

pub const CLEAR: &str = "window.__snippetBench.target.innerHTML = ''; true";

/// `getComputedStyle` reads force a style recalculation.
pub const FORCE_STYLE: &str = "getComputedStyle(window.__snippetBench.target).color; true";

/// `offsetWidth` reads force layout.
pub const FORCE_LAYOUT: &str = "window.__snippetBench.target.offsetWidth; true";

pub const NOW: &str = "performance.now()";

pub const NEXT_FRAME: &str = "new Promise(resolve => requestAnimationFrame(() => resolve(true)))";

pub const STOP_WARMING: &str = "window.__snippetBench.stopWarming(); true";

/// JSON text is a valid JavaScript string literal.
fn js_string(s: &str) -> Result<String> {
    serde_json::to_string(s)
        .map_err(|e| BenchError::host(format!("failed to encode script string: {}", e)))
}

pub fn inject(markup: &str) -> Result<String> {
    Ok(format!(
        "window.__snippetBench.target.innerHTML = {}; true",
        js_string(markup)?
    ))
}

/// Runs one whole sample inside the page and resolves to the five phase
/// boundaries `[startParse, startStyle, startLayout, startPaint, endPaint]`.
///
/// No DevTools round trip lands between two readings, so the timed phases
/// hold only renderer work and the `setTimeout(0)` paint opportunity.
pub fn render_timed(markup: &str, separate_style_pass: bool) -> Result<String> {
    let style = if separate_style_pass {
        "getComputedStyle(target).color;"
    } else {
        ""
    };
    Ok(format!(
        "(async () => {{ \
            const target = window.__snippetBench.target; \
            const markup = {markup}; \
            const t0 = performance.now(); \
            target.innerHTML = markup; \
            const t1 = performance.now(); \
            {style} \
            const t2 = performance.now(); \
            target.offsetWidth; \
            const t3 = performance.now(); \
            await new Promise(resolve => setTimeout(resolve, 0)); \
            const t4 = performance.now(); \
            return [t0, t1, t2, t3, t4]; \
        }})()",
        markup = js_string(markup)?,
        style = style,
    ))
}

pub fn delay(ms: f64) -> String {
    format!(
        "new Promise(resolve => setTimeout(() => resolve(true), {}))",
        ms.max(0.0)
    )
}

pub fn start_warming(quantum_ms: f64) -> String {
    format!("window.__snippetBench.startWarming({}); true", quantum_ms)
}

pub fn mark(name: &str, timestamp: f64) -> Result<String> {
    Ok(format!(
        "performance.mark({}, {{ startTime: {} }}); true",
        js_string(name)?,
        timestamp
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_creates_named_target() {
        assert!(SETUP.contains(&format!("target.id = '{}'", TARGET_ID)));
    }

    #[test]
    fn test_inject_escapes_markup() {
        let script = inject("<div title=\"a'b\">\n</div>").unwrap();
        assert_eq!(
            script,
            r#"window.__snippetBench.target.innerHTML = "<div title=\"a'b\">\n</div>"; true"#
        );
    }

    #[test]
    fn test_delay_clamps_negative() {
        assert_eq!(
            delay(-5.0),
            "new Promise(resolve => setTimeout(() => resolve(true), 0))"
        );
        assert!(delay(200.0).ends_with(", 200))"));
    }

    #[test]
    fn test_mark_uses_start_time() {
        assert_eq!(
            mark("a_0_1 - startParse", 12.5).unwrap(),
            r#"performance.mark("a_0_1 - startParse", { startTime: 12.5 }); true"#
        );
    }

    #[test]
    fn test_inject_survives_control_and_unicode_markup() {
        let markup = "<p>\u{0}\u{2028}\u{1F600}</p>";
        let script = inject(markup).unwrap();
        let literal = script
            .strip_prefix("window.__snippetBench.target.innerHTML = ")
            .and_then(|rest| rest.strip_suffix("; true"))
            .unwrap();
        let decoded: String = serde_json::from_str(literal).unwrap();
        assert_eq!(decoded, markup);
        assert_ne!(literal, "''");
    }

    #[test]
    fn test_render_timed_reads_clock_around_each_phase() {
        let script = render_timed("<b>x</b>", true).unwrap();
        assert_eq!(script.matches("performance.now()").count(), 5);
        assert!(script.contains(r#"const markup = "<b>x</b>";"#));
        assert!(script.contains("getComputedStyle(target).color;"));
        assert!(script.contains("setTimeout(resolve, 0)"));
        assert!(script.contains("return [t0, t1, t2, t3, t4];"));

        // Markup is bound before the first reading, then only the assignment
        // separates t0 from t1.
        let bind = script.find("const markup").unwrap();
        let t0 = script.find("const t0").unwrap();
        let assign = script.find("target.innerHTML = markup").unwrap();
        let t1 = script.find("const t1").unwrap();
        assert!(bind < t0 && t0 < assign && assign < t1);
    }

    #[test]
    fn test_render_timed_without_style_pass() {
        let script = render_timed("<b>x</b>", false).unwrap();
        assert!(!script.contains("getComputedStyle"));
        assert_eq!(script.matches("performance.now()").count(), 5);
    }

    #[test]
    fn test_start_warming_passes_quantum() {
        assert_eq!(
            start_warming(1.0),
            "window.__snippetBench.startWarming(1); true"
        );
    }
}
