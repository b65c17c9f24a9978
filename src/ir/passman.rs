//! # Pass Manager
//!
//! The pass manager holds the string parameters of the analysis passes and
//! exposes them as command line arguments. Passes are run through the manager
//! so that they always see the current parameters.

use std::str::FromStr;

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::{Context, Func};

#[derive(Debug, Error)]
pub enum PassErrorKind {
    #[error("analysis error")]
    AnalysisError,

    #[error("other error")]
    Other,
}

#[derive(Debug, Error)]
#[error("{kind} on {pass_name}: {err}")]
pub struct PassError {
    kind: PassErrorKind,
    err: Box<dyn std::error::Error + Send + Sync>,
    pass_name: String,
}

pub type PassResult<T> = Result<T, PassError>;

impl PassError {
    pub fn analysis_error(
        pass_name: impl Into<String>,
        err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind: PassErrorKind::AnalysisError,
            err: err.into(),
            pass_name: pass_name.into(),
        }
    }

    pub fn other(
        pass_name: impl Into<String>,
        err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind: PassErrorKind::Other,
            err: err.into(),
            pass_name: pass_name.into(),
        }
    }

    pub fn kind(&self) -> &PassErrorKind { &self.kind }

    pub fn pass_name(&self) -> &str { &self.pass_name }

    /// The underlying error.
    pub fn source_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.err.as_ref()
    }
}

/// A pass that can be run on a function.
pub trait LocalPass {
    /// The output of the pass.
    type Output;

    /// Run the pass on the given function.
    fn run(&mut self, ctx: &Context, func: Func) -> PassResult<Self::Output>;

    fn fetch_params(&mut self, _params: &ParamStorage) {}
}

/// A pass that can be run on a whole context.
pub trait GlobalPass {
    /// The output of the pass.
    type Output;

    /// Run the pass on the given context.
    fn run(&mut self, ctx: &Context) -> PassResult<Self::Output>;

    fn fetch_params(&mut self, _params: &ParamStorage) {}
}

#[derive(Default)]
pub struct ParamStorage {
    parameters: FxHashMap<String, String>,
}

impl ParamStorage {
    fn insert(&mut self, name: impl Into<String>, default: impl ToString) {
        self.parameters.insert(name.into(), default.to_string());
    }

    /// Set a registered parameter, unknown names are ignored.
    fn set<T: ToString>(&mut self, name: impl Into<String>, value: T) -> bool {
        match self.parameters.get_mut(&name.into()) {
            Some(param) => {
                *param = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn get<T: FromStr>(&self, name: impl AsRef<str>) -> Option<T> {
        self.parameters
            .get(name.as_ref())
            .and_then(|v| v.parse().ok())
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &String)> { self.parameters.iter() }
}

#[derive(Default)]
pub struct PassManager {
    parameters: ParamStorage,
}

impl PassManager {
    pub fn new() -> Self { Self::default() }

    pub fn add_parameter(&mut self, name: impl Into<String>, default: impl ToString) {
        self.parameters.insert(name, default);
    }

    /// Set a parameter, returns `false` if it was never registered.
    pub fn set_parameter<T: ToString>(&mut self, name: impl Into<String>, value: T) -> bool {
        self.parameters.set(name, value)
    }

    pub fn params(&self) -> &ParamStorage { &self.parameters }

    pub fn gather_parameter_names(&self) -> Vec<(String, String)> {
        let mut names: Vec<(String, String)> = self
            .parameters
            .iter()
            .map(|(name, default)| (name.to_string(), default.to_string()))
            .collect();
        names.sort();
        names
    }

    /// One `--<name> <value>` argument per parameter, defaulting to the
    /// current value.
    pub fn get_cli_args(&self) -> Vec<clap::Arg> {
        self.gather_parameter_names()
            .into_iter()
            .map(|(name, default)| clap::Arg::new(&name).long(&name).default_value(default))
            .collect()
    }

    /// Read back the parameters from arguments built by
    /// [get_cli_args](Self::get_cli_args).
    pub fn apply_matches(&mut self, matches: &clap::ArgMatches) {
        for (name, _) in self.gather_parameter_names() {
            if let Ok(Some(value)) = matches.try_get_one::<String>(&name) {
                let value = value.clone();
                self.parameters.set(name, value);
            }
        }
    }

    pub fn run_local<P: LocalPass>(
        &self,
        pass: &mut P,
        ctx: &Context,
        func: Func,
    ) -> PassResult<P::Output> {
        pass.fetch_params(&self.parameters);
        pass.run(ctx, func)
    }

    pub fn run_global<P: GlobalPass>(&self, pass: &mut P, ctx: &Context) -> PassResult<P::Output> {
        pass.fetch_params(&self.parameters);
        pass.run(ctx)
    }
}
