use std::{sync::OnceLock, time::Duration};

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use redcode::RelaxedWarrior;
use redcode_parser::parse_warrior;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::templates;

/// A compact Redcode reference included in every prompt so the service has
/// the full instruction set in context
const REDCODE_GUIDE: &str = "\
Redcode-94 reference:

Opcodes: DAT (data, kills the process), MOV (copy), ADD, SUB, MUL, DIV, MOD
(arithmetic; DIV/MOD by zero kills), JMP, JMZ, JMN, DJN (jumps), SPL (spawn
a new process), CMP/SEQ, SNE, SLT (skips), NOP.

Modifiers: .A .B .AB .BA .F .X .I select which operand fields an operation
reads and writes.  When omitted, standard defaults apply.

Addressing modes: # immediate, $ direct (default), * A-indirect,
@ B-indirect, { A-predecrement, < B-predecrement, } A-postincrement,
> B-postincrement.

One instruction per line: OPCODE[.MODIFIER] operand, operand
Example imp: MOV.I 0, 1
Example dwarf:
ADD.AB #4, 3
MOV.I  2, @2
JMP    -2
DAT    #0, #0

Strong warriors bomb memory, replicate, scan for enemies, or split into
many processes with SPL.  Use relative addressing; keep programs compact.";

/// Strategy seeds for fresh generation, one chosen per request
const STRATEGIES: [&str; 8] = [
    "a bomber that writes DAT instructions at various memory locations",
    "a replicator that copies itself to spread across memory",
    "a scanner that searches for enemy code and attacks it",
    "a paper warrior that uses SPL to create many threads",
    "a quick-scanning attacker that finds and destroys enemies fast",
    "a hybrid bomber-replicator for robustness",
    "a stealthy warrior that hides and attacks unexpectedly",
    "a multi-threaded bomber that attacks from multiple locations",
];

/// Mutation goals, one chosen per request
const MUTATION_GOALS: [&str; 10] = [
    "Improve the bombing pattern to cover more memory",
    "Add more threading with SPL instructions",
    "Make it more defensive by adding self-checks",
    "Increase attack speed",
    "Add a secondary attack strategy",
    "Optimize instruction count",
    "Add decoy code to confuse scanners",
    "Improve replication efficiency",
    "Change addressing modes for better performance",
    "Add a scanning component to find enemies",
];

/// A single request to a text-generation service
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    /// Instructions framing the task
    pub system: String,
    /// The task itself
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Response length cap
    pub max_tokens: u32,
    /// Wall-clock budget the backend should enforce
    pub timeout: Duration,
}

/// Failures crossing the service boundary.  Parse failures are not
/// transport errors; they are recovered internally by the operator.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The service could not be reached or dropped the connection
    #[error("network failure talking to the text generation service: {0}")]
    Network(String),

    /// The service rejected our credentials
    #[error("text generation service rejected authentication: {0}")]
    Auth(String),

    /// The wall-clock budget ran out
    #[error("text generation timed out after {0:?}")]
    Timeout(Duration),
}

/// The port a text-generation backend implements.  HTTP clients, local
/// inference daemons, and test stubs all live behind this.
pub trait TextGenerator {
    /// Produce a completion for the request.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] for network, auth, or timeout failures.
    fn complete(
        &mut self,
        request: &CompletionRequest,
    ) -> Result<String, TransportError>;

    /// Identifier for logs and run summaries, e.g. a model name
    fn name(&self) -> &str;
}

/// Counters every variation operator maintains
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VariationStats {
    /// Calls to `generate_random`
    pub generations: u64,
    /// Calls to `mutate`
    pub mutations: u64,
    /// Calls to `crossover`
    pub crossovers: u64,
    /// Requests whose output could not be used, recovered by fallback
    pub parse_failures: u64,
}

impl VariationStats {
    /// Fraction of requests that produced a usable warrior
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let requests = self.generations + self.mutations + self.crossovers;
        if requests == 0 {
            return 1.0;
        }
        (requests.saturating_sub(self.parse_failures)) as f64
            / requests as f64
    }
}

/// How new warriors come to exist.  All three operations are total:
/// failures recover internally via fallbacks and show up only in
/// [`VariationStats::parse_failures`].
pub trait Variation {
    /// A fresh warrior from nothing
    fn generate_random(&mut self) -> RelaxedWarrior;

    /// A variant of an existing warrior
    fn mutate(&mut self, parent: &RelaxedWarrior) -> RelaxedWarrior;

    /// A child combining two warriors
    fn crossover(
        &mut self,
        first: &RelaxedWarrior,
        second: &RelaxedWarrior,
    ) -> RelaxedWarrior;

    /// Lifetime counters
    fn stats(&self) -> VariationStats;
}

/// Tunables for prompting and validation
#[derive(Clone, Debug)]
pub struct PromptConfig {
    /// Sampling temperature
    pub temperature: f64,
    /// Response length cap
    pub max_tokens: u32,
    /// Longest warrior the operator will accept
    pub max_warrior_length: usize,
    /// Fixed strategy for generation instead of a random one
    pub strategy_hint: Option<String>,
    /// Per-request wall-clock budget
    pub timeout: Duration,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            max_tokens: 1024,
            max_warrior_length: 50,
            strategy_hint: None,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Pull redcode out of a service response.
///
/// Policy: the first fenced code block wins; otherwise the lines that look
/// like redcode (opcode or comment prefixed); otherwise the raw response,
/// leaving the lenient parser to salvage what it can.
fn extract_code(response: &str) -> String {
    /// Matches the first fenced block, with or without a language tag
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?si)```(?:redcode|assembly|asm)?[ \t]*\r?\n?(.*?)```")
            .expect("fence pattern is valid")
    });

    if let Some(block) = fence
        .captures(response)
        .and_then(|captures| captures.get(1))
    {
        return block.as_str().trim().to_owned();
    }

    let redcode_lines: Vec<&str> = response
        .lines()
        .map(str::trim)
        .filter(|line| looks_like_redcode(line))
        .collect();
    if redcode_lines.is_empty() {
        response.to_owned()
    } else {
        redcode_lines.join("\n")
    }
}

/// True for lines beginning with an opcode token or a comment marker
fn looks_like_redcode(line: &str) -> bool {
    const OPCODE_TOKENS: [&str; 17] = [
        "DAT", "MOV", "ADD", "SUB", "MUL", "DIV", "MOD", "JMP", "JMZ",
        "JMN", "DJN", "SPL", "CMP", "SEQ", "SNE", "SLT", "NOP",
    ];
    if line.starts_with(';') {
        return true;
    }
    let upper = line.to_ascii_uppercase();
    OPCODE_TOKENS.iter().any(|token| upper.starts_with(token))
}

/// A classic template, renamed, as the generation fallback
fn fallback_generate<R: Rng>(rng: &mut R, serial: u64) -> RelaxedWarrior {
    let mut warrior = templates::random_classic(rng);
    warrior.name = format!("Fallback_{serial}");
    warrior
}

/// Copy the parent and nudge one operand value, as the mutation fallback
fn fallback_mutate<R: Rng>(
    rng: &mut R,
    parent: &RelaxedWarrior,
) -> RelaxedWarrior {
    let mut child = parent.clone();
    child.name = format!("{}_mut", parent.name);
    if !child.code.is_empty() {
        let idx = rng.gen_range(0..child.code.len());
        let delta = rng.gen_range(-5..=5_i64);
        if rng.gen_bool(0.5) {
            child.code[idx].a_field += delta;
        } else {
            child.code[idx].b_field += delta;
        }
    }
    child
}

/// First half of one parent, second half of the other, as the crossover
/// fallback
fn fallback_crossover(
    first: &RelaxedWarrior,
    second: &RelaxedWarrior,
    max_length: usize,
) -> RelaxedWarrior {
    let split_first = first.code.len() / 2;
    let split_second = second.code.len() / 2;
    let mut code: Vec<_> = first.code[..split_first]
        .iter()
        .chain(&second.code[split_second..])
        .copied()
        .collect();
    code.truncate(max_length);
    RelaxedWarrior {
        name: format!("{}x{}", first.name, second.name),
        author: "Crossover".into(),
        code,
        start: 0,
    }
}

/// The variation operator backed by a text-generation service.
///
/// Each operation builds a prompt, asks the service (retrying once on a
/// transport failure), extracts and parses the response, and validates the
/// result against the length budget.  Anything unusable falls back to the
/// local strategies and bumps the parse-failure counter.
pub struct LlmVariation<G> {
    /// The service backend
    generator: G,
    /// Prompting tunables
    config: PromptConfig,
    /// Lifetime counters
    stats: VariationStats,
    /// Randomness for strategy choice and fallbacks
    rng: StdRng,
}

impl<G: TextGenerator> LlmVariation<G> {
    /// Wrap a backend with the given tunables
    pub fn new(generator: G, config: PromptConfig) -> Self {
        Self {
            generator,
            config,
            stats: VariationStats::default(),
            rng: StdRng::from_entropy(),
        }
    }

    /// The backend's identifier
    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Issue a request, retrying once on transport failure
    fn request(
        &mut self,
        system: String,
        prompt: String,
    ) -> Result<String, TransportError> {
        let request = CompletionRequest {
            system,
            prompt,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            timeout: self.config.timeout,
        };
        match self.generator.complete(&request) {
            Ok(response) => Ok(response),
            Err(err) => {
                log::warn!("text generation failed, retrying once: {err}");
                self.generator.complete(&request)
            }
        }
    }

    /// Extract, parse, and validate a response into a warrior
    fn assemble(&self, response: &str) -> Option<RelaxedWarrior> {
        let warrior = parse_warrior(&extract_code(response));
        let usable = !warrior.is_empty()
            && warrior.len() <= self.config.max_warrior_length;
        usable.then_some(warrior)
    }
}

impl<G: TextGenerator> Variation for LlmVariation<G> {
    fn generate_random(&mut self) -> RelaxedWarrior {
        self.stats.generations += 1;

        let strategy = self.config.strategy_hint.clone().unwrap_or_else(|| {
            (*STRATEGIES.choose(&mut self.rng).unwrap_or(&STRATEGIES[0]))
                .to_owned()
        });
        let system = format!(
            "You are an expert Core War programmer.  Generate valid \
             Redcode-94 warriors.\n\n{REDCODE_GUIDE}\n\nAlways output \
             redcode that parses."
        );
        let prompt = format!(
            "Generate a Core War warrior in Redcode.\n\nStrategy: create \
             {strategy}\n\nRequirements:\n- Maximum {} instructions\n- \
             Valid Redcode-94 syntax\n- Give the warrior a creative name \
             with a ;name comment\n\nReturn ONLY the Redcode.",
            self.config.max_warrior_length
        );

        match self.request(system, prompt) {
            Ok(response) => {
                if let Some(warrior) = self.assemble(&response) {
                    return warrior;
                }
                log::warn!("generated response had no usable warrior");
            }
            Err(err) => log::warn!("generation fell back locally: {err}"),
        }
        self.stats.parse_failures += 1;
        fallback_generate(&mut self.rng, self.stats.generations)
    }

    fn mutate(&mut self, parent: &RelaxedWarrior) -> RelaxedWarrior {
        self.stats.mutations += 1;

        let goal = *MUTATION_GOALS
            .choose(&mut self.rng)
            .unwrap_or(&MUTATION_GOALS[0]);
        let system = format!(
            "You are an expert Core War programmer.  Improve warriors \
             while keeping valid Redcode-94 syntax.\n\n{REDCODE_GUIDE}"
        );
        let prompt = format!(
            "Mutate this Core War warrior to improve it.\n\nCurrent \
             warrior:\n```\n{parent}\n```\n\nMutation goal: {goal}\n\n\
             Requirements:\n- Keep the core strategy but improve it\n- \
             Maximum {} instructions\n- Make meaningful changes\n\nReturn \
             ONLY the improved Redcode.",
            self.config.max_warrior_length
        );

        match self.request(system, prompt) {
            Ok(response) => {
                if let Some(warrior) = self.assemble(&response) {
                    return warrior;
                }
                log::warn!("mutation response had no usable warrior");
            }
            Err(err) => log::warn!("mutation fell back locally: {err}"),
        }
        self.stats.parse_failures += 1;
        fallback_mutate(&mut self.rng, parent)
    }

    fn crossover(
        &mut self,
        first: &RelaxedWarrior,
        second: &RelaxedWarrior,
    ) -> RelaxedWarrior {
        self.stats.crossovers += 1;

        let system = format!(
            "You are an expert Core War programmer.  Create hybrid \
             warriors by combining strategies.\n\n{REDCODE_GUIDE}"
        );
        let prompt = format!(
            "Combine these two Core War warriors into a new hybrid.\n\n\
             Parent 1:\n```\n{first}\n```\n\nParent 2:\n```\n{second}\n```\
             \n\nRequirements:\n- Combine the best of both parents\n- \
             Maximum {} instructions\n- Create something new, not a \
             concatenation\n\nReturn ONLY the new hybrid Redcode.",
            self.config.max_warrior_length
        );

        match self.request(system, prompt) {
            Ok(response) => {
                if let Some(warrior) = self.assemble(&response) {
                    return warrior;
                }
                log::warn!("crossover response had no usable warrior");
            }
            Err(err) => log::warn!("crossover fell back locally: {err}"),
        }
        self.stats.parse_failures += 1;
        fallback_crossover(first, second, self.config.max_warrior_length)
    }

    fn stats(&self) -> VariationStats {
        self.stats
    }
}

/// A self-contained variation operator with no service behind it: the
/// fallback strategies promoted to the primary path.  This is what tests,
/// CI, and offline runs use, and what the controller degrades to when a
/// service keeps failing.
pub struct LocalVariation {
    /// Randomness for template choice and perturbation
    rng: StdRng,
    /// Longest warrior `crossover` will produce
    max_warrior_length: usize,
    /// Lifetime counters
    stats: VariationStats,
}

impl LocalVariation {
    /// An operator seeded from the OS entropy pool
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// A deterministic operator for reproducible runs and tests
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Shared constructor
    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            max_warrior_length: PromptConfig::default().max_warrior_length,
            stats: VariationStats::default(),
        }
    }
}

impl Default for LocalVariation {
    fn default() -> Self {
        Self::new()
    }
}

impl Variation for LocalVariation {
    /// A classic template, lightly perturbed so the initial population is
    /// not four identical programs
    fn generate_random(&mut self) -> RelaxedWarrior {
        self.stats.generations += 1;
        let template = templates::random_classic(&mut self.rng);
        let mut warrior = fallback_mutate(&mut self.rng, &template);
        warrior.name =
            format!("{}_{}", template.name, self.stats.generations);
        warrior
    }

    fn mutate(&mut self, parent: &RelaxedWarrior) -> RelaxedWarrior {
        self.stats.mutations += 1;
        fallback_mutate(&mut self.rng, parent)
    }

    fn crossover(
        &mut self,
        first: &RelaxedWarrior,
        second: &RelaxedWarrior,
    ) -> RelaxedWarrior {
        self.stats.crossovers += 1;
        fallback_crossover(first, second, self.max_warrior_length)
    }

    fn stats(&self) -> VariationStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use coverage_helper::test;

    use super::{
        extract_code, CompletionRequest, LlmVariation, LocalVariation,
        PromptConfig, TextGenerator, TransportError, Variation,
    };
    use crate::templates;

    /// A backend that replays a scripted sequence of responses
    struct Scripted {
        /// Upcoming responses, consumed front to back
        responses: VecDeque<Result<String, TransportError>>,
        /// Requests seen, for assertions
        requests: usize,
    }

    impl Scripted {
        fn new(
            responses: Vec<Result<String, TransportError>>,
        ) -> Self {
            Self {
                responses: responses.into(),
                requests: 0,
            }
        }
    }

    impl TextGenerator for Scripted {
        fn complete(
            &mut self,
            _request: &CompletionRequest,
        ) -> Result<String, TransportError> {
            self.requests += 1;
            self.responses.pop_front().unwrap_or_else(|| {
                Err(TransportError::Timeout(Duration::from_secs(0)))
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn extraction_prefers_the_first_fenced_block() {
        let response = "Here is a warrior:\n```redcode\nMOV.I 0, 1\n```\n\
                        and another:\n```\nDAT 0, 0\n```";
        assert_eq!(extract_code(response), "MOV.I 0, 1");
    }

    #[test]
    fn extraction_falls_back_to_redcode_looking_lines() {
        let response = "Sure! The plan:\n; a tiny imp\nMOV.I 0, 1\n\
                        Hope that helps!";
        assert_eq!(extract_code(response), "; a tiny imp\nMOV.I 0, 1");
    }

    #[test]
    fn extraction_passes_raw_text_through_as_last_resort() {
        let response = "nothing here resembles assembly";
        assert_eq!(extract_code(response), response);
    }

    #[test]
    fn generated_response_becomes_a_warrior() {
        let backend = Scripted::new(vec![Ok(
            ";name Fresh\n```\nMOV.I 0, 1\nSPL 0, 0\n```".to_owned(),
        )]);
        let mut variation =
            LlmVariation::new(backend, PromptConfig::default());
        let warrior = variation.generate_random();
        assert_eq!(warrior.len(), 2);
        assert_eq!(variation.stats().generations, 1);
        assert_eq!(variation.stats().parse_failures, 0);
    }

    #[test]
    fn transport_failure_retries_once_then_falls_back() {
        let backend = Scripted::new(vec![
            Err(TransportError::Network("connection reset".into())),
            Err(TransportError::Network("connection reset".into())),
        ]);
        let mut variation =
            LlmVariation::new(backend, PromptConfig::default());
        let warrior = variation.generate_random();
        assert!(!warrior.is_empty());
        assert!(warrior.name.starts_with("Fallback_"));
        assert_eq!(variation.stats().parse_failures, 1);
        assert_eq!(variation.generator.requests, 2);
        assert!(variation.stats().success_rate() < 1.0);
    }

    #[test]
    fn retry_succeeding_avoids_the_fallback() {
        let backend = Scripted::new(vec![
            Err(TransportError::Timeout(Duration::from_secs(60))),
            Ok("```\nMOV.I 0, 1\n```".to_owned()),
        ]);
        let mut variation =
            LlmVariation::new(backend, PromptConfig::default());
        let warrior = variation.generate_random();
        assert_eq!(warrior.len(), 1);
        assert_eq!(variation.stats().parse_failures, 0);
    }

    #[test]
    fn empty_response_counts_as_parse_failure() {
        let backend =
            Scripted::new(vec![Ok("I cannot write that program.".into())]);
        let mut variation =
            LlmVariation::new(backend, PromptConfig::default());
        let warrior = variation.mutate(&templates::imp());
        assert!(!warrior.is_empty());
        assert_eq!(variation.stats().parse_failures, 1);
        assert_eq!(variation.stats().mutations, 1);
    }

    #[test]
    fn oversized_response_counts_as_parse_failure() {
        let long_program = ";name Long\n".to_owned()
            + &"NOP 0, 0\n".repeat(51);
        let backend = Scripted::new(vec![Ok(long_program)]);
        let mut variation =
            LlmVariation::new(backend, PromptConfig::default());
        let warrior = variation.generate_random();
        assert!(warrior.len() <= 50);
        assert_eq!(variation.stats().parse_failures, 1);
    }

    #[test]
    fn local_mutation_changes_exactly_one_operand() {
        let mut variation = LocalVariation::seeded(11);
        let parent = templates::dwarf();
        let child = variation.mutate(&parent);
        assert_eq!(child.len(), parent.len());
        let changed: usize = parent
            .code
            .iter()
            .zip(&child.code)
            .filter(|(a, b)| a != b)
            .count();
        assert!(changed <= 1, "at most one instruction may change");
        assert_eq!(child.name, "Dwarf_mut");
    }

    #[test]
    fn local_crossover_halves_and_caps() {
        let mut variation = LocalVariation::seeded(11);
        let first = templates::dwarf();
        let second = templates::imp();
        let child = variation.crossover(&first, &second);
        assert_eq!(child.name, "DwarfxImp");
        // first half of the dwarf (2) plus second half of the imp (1)
        assert_eq!(child.len(), 3);
    }

    #[test]
    fn local_generation_is_deterministic_under_a_seed() {
        let mut a = LocalVariation::seeded(99);
        let mut b = LocalVariation::seeded(99);
        for _ in 0..5 {
            assert_eq!(a.generate_random(), b.generate_random());
        }
    }
}
