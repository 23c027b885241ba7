//! Contexto de run explícito. Reemplaza el estado ambiente "run actual":
//! cada sitio de tracking recibe el contexto como argumento, sin acoplamiento
//! oculto entre llamadas.

use log::info;

use lake_domain::Run;

use crate::config::Settings;
use crate::errors::CoreError;
use crate::registry::Registry;

#[derive(Debug, Clone)]
pub struct RunContext {
    run: Run,
}

impl RunContext {
    /// Registra un run nuevo y devuelve el contexto que lo transporta.
    pub fn track(name: Option<&str>,
                 reference: Option<&str>,
                 reference_type: Option<&str>,
                 settings: &Settings,
                 registry: &mut dyn Registry)
                 -> Result<Self, CoreError> {
        let run = Run::new(name, reference, reference_type, settings.user())?;
        registry.add_run(&run)?;
        info!("run registrado: {} ({})", run.id(), run.name().unwrap_or("sin nombre"));
        Ok(RunContext { run })
    }

    /// Envuelve un run ya registrado.
    pub fn from_run(run: Run) -> Self { RunContext { run } }

    pub fn run(&self) -> &Run { &self.run }
}
