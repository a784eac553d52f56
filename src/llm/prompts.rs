// Prompt templates

/// Complaint triage prompt. `{text}` is replaced with the complaint verbatim.
pub const COMPLAINT_ANALYSIS_PROMPT: &str = r#"You are triaging complaints submitted by citizens to their local authority.

Analyze this citizen complaint and determine its priority level.

Complaint: "{text}"

Priority levels:
- Critical: life-threatening emergencies such as fires, explosions, gas leaks, collapsed structures, or anyone in immediate danger.
- High: significant safety hazards or service disruptions such as flooding, burst water mains, broken traffic signals, or power outages affecting many people.
- Medium: problems with a moderate impact on daily life such as potholes, broken streetlights, missed garbage collection, or faulty public equipment.
- Low: minor or aesthetic issues such as graffiti, overgrown grass, litter, or general suggestions.

Return ONLY valid JSON, with no markdown and no extra text:
{
  "summary": "one sentence summary",
  "priority": "Critical | High | Medium | Low",
  "reason": "brief explanation"
}
"#;

pub fn complaint_analysis_prompt(text: &str) -> String {
    COMPLAINT_ANALYSIS_PROMPT.replace("{text}", text)
}
