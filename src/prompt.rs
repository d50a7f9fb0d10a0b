use tera::{Context, Tera};

const PROTOCOL_SYSTEM: &str = "protocol_system";
const UNIT_TEST_GENERATION: &str = "unit_test_generation";
const DOC_GENERATION: &str = "doc_generation";
const HEALING: &str = "healing";

const PROTOCOL_SYSTEM_TEMPLATE: &str = "\
You are a meticulous {{ artifact_label }} author working inside a strict conversation protocol.

Reply with exactly one JSON object per turn and nothing else: no prose, no markdown fences.

Actions:
- Request file contents when you are missing context:
  {\"action\": \"read_files\", \"files\": [\"path/one.ts\", \"path/two.ts\"]}
- Deliver a newly written artifact:
  {\"action\": \"generate\", \"code\": \"<complete file content>\"}
- Deliver a repaired artifact:
  {\"action\": \"fix\", \"code\": \"<complete file content>\"}
- Confirm an artifact that needs no change:
  {\"action\": \"success\", \"code\": \"<complete file content>\"}

Rules:
- Paths are relative to the project root.
- `code` always carries the complete file, never a fragment or diff.
- Request files only when their content changes what you produce.
- An unparsable reply aborts the whole exchange.
";

const UNIT_TEST_GENERATION_TEMPLATE: &str = "\
Write unit tests for the source file below. The result will be saved as {{ artifact_path }}.

Source file {{ source_path }}:
{{ source }}

Cover the exported behavior including edge cases, following the conventions visible in the source. Reply with the generate action once you have what you need.
";

const DOC_GENERATION_TEMPLATE: &str = "\
Write reference documentation in markdown for the source file below. The result will be saved as {{ artifact_path }}.

Source file {{ source_path }}:
{{ source }}

Start with a level-one heading naming the module, then describe its exported API, parameters and behavior. Reply with the generate action once you have what you need.
";

const HEALING_TEMPLATE: &str = "\
The artifact at {{ artifact_path }} failed validation.

Validator verdict:
{{ verdict }}

Current artifact content:
{{ current }}

Source file {{ source_path }} (fresh read):
{{ source }}

Produce a corrected version of the complete artifact. Reply with the fix action, or success if the current artifact is already correct.
";

/// Tera-backed prompt library. All templates are registered inline at
/// construction; rendering never touches the filesystem.
pub struct PromptEngine {
    tera: Tera,
}

impl PromptEngine {
    pub fn new() -> anyhow::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(PROTOCOL_SYSTEM, PROTOCOL_SYSTEM_TEMPLATE)?;
        tera.add_raw_template(UNIT_TEST_GENERATION, UNIT_TEST_GENERATION_TEMPLATE)?;
        tera.add_raw_template(DOC_GENERATION, DOC_GENERATION_TEMPLATE)?;
        tera.add_raw_template(HEALING, HEALING_TEMPLATE)?;
        Ok(Self { tera })
    }

    /// System prompt establishing the turn protocol.
    /// `artifact_label` names what the oracle is writing ("unit test",
    /// "documentation").
    pub fn protocol_system(&self, artifact_label: &str) -> anyhow::Result<String> {
        let mut ctx = Context::new();
        ctx.insert("artifact_label", artifact_label);
        Ok(self.tera.render(PROTOCOL_SYSTEM, &ctx)?)
    }

    pub fn unit_test_generation(
        &self,
        source_path: &str,
        source: &str,
        artifact_path: &str,
    ) -> anyhow::Result<String> {
        let mut ctx = Context::new();
        ctx.insert("source_path", source_path);
        ctx.insert("source", source);
        ctx.insert("artifact_path", artifact_path);
        Ok(self.tera.render(UNIT_TEST_GENERATION, &ctx)?)
    }

    pub fn doc_generation(
        &self,
        source_path: &str,
        source: &str,
        artifact_path: &str,
    ) -> anyhow::Result<String> {
        let mut ctx = Context::new();
        ctx.insert("source_path", source_path);
        ctx.insert("source", source);
        ctx.insert("artifact_path", artifact_path);
        Ok(self.tera.render(DOC_GENERATION, &ctx)?)
    }

    pub fn healing(
        &self,
        artifact_path: &str,
        verdict: &str,
        current: &str,
        source_path: &str,
        source: &str,
    ) -> anyhow::Result<String> {
        let mut ctx = Context::new();
        ctx.insert("artifact_path", artifact_path);
        ctx.insert("verdict", verdict);
        ctx.insert("current", current);
        ctx.insert("source_path", source_path);
        ctx.insert("source", source);
        Ok(self.tera.render(HEALING, &ctx)?)
    }
}
