//! # Placeholder Steps
//!
//! The four stages of the data pipeline. Their numbers are randomized
//! placeholders drawn from a [`Workload`]; what matters is that every human
//! decision is folded into the step result so later stages can read it.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::source::Workload;
use crate::error::Result;
use crate::orchestration::{PipelineStep, StepExecution, StepOutput, StepResult};

pub const DATA_PREPARATION: &str = "Подготовка данных";
pub const DATA_PROCESSING: &str = "Обработка данных";
pub const DATA_ANALYSIS: &str = "Анализ данных";
pub const REPORT_GENERATION: &str = "Генерация отчета";

pub const PROCESSING_TYPES: [&str; 3] = [
    "Стандартная обработка",
    "Детальная обработка",
    "Быстрая обработка",
];
pub const ANALYSIS_METHODS: [&str; 3] = [
    "Статистический анализ",
    "Машинное обучение",
    "Поиск паттернов",
];
pub const REPORT_FORMATS: [&str; 3] = ["Подробный отчет", "Краткий отчет", "Презентация"];
pub const CHART_OPTIONS: [&str; 2] = ["Да, включить графики", "Нет, только текст"];

const DEFAULT_DATA_SIZE: u64 = 100;
const QUALITY_MIN: f64 = 0.1;
const QUALITY_MAX: f64 = 1.0;

/// The standard four-step chain
pub fn standard_pipeline(workload: Arc<dyn Workload>) -> Vec<Arc<dyn PipelineStep>> {
    vec![
        Arc::new(DataPreparation::new(workload.clone())),
        Arc::new(DataProcessing::new(workload.clone())),
        Arc::new(DataAnalysis::new(workload.clone())),
        Arc::new(ReportGeneration::new(workload)),
    ]
}

/// Percent reached after milestone `done` of `total`
fn milestone_percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    done as f64 * 100.0 / total as f64
}

/// Step 1: asks how to process the data and prepares it
#[derive(Debug)]
pub struct DataPreparation {
    workload: Arc<dyn Workload>,
}

impl DataPreparation {
    const MILESTONES: usize = 5;
    const MILESTONE_DELAY: Duration = Duration::from_secs(1);

    pub fn new(workload: Arc<dyn Workload>) -> Self {
        Self { workload }
    }

    fn delay_factor(processing_type: &str) -> f64 {
        match processing_type {
            "Детальная обработка" => 1.5,
            "Быстрая обработка" => 0.5,
            _ => 1.0,
        }
    }
}

#[async_trait]
impl PipelineStep for DataPreparation {
    fn name(&self) -> &str {
        DATA_PREPARATION
    }

    async fn execute(&self, exec: &mut StepExecution, input: &StepResult) -> Result<StepOutput> {
        let data_size = input.get_u64_or("data_size", DEFAULT_DATA_SIZE);

        let request = exec.select_request("Выберите тип обработки данных", &PROCESSING_TYPES);
        let processing_type = exec.request_input(request).await?.as_text();
        let delay = Self::MILESTONE_DELAY.mul_f64(Self::delay_factor(&processing_type));

        for i in 1..=Self::MILESTONES {
            self.workload.pause(delay).await;
            let percent = milestone_percent(i, Self::MILESTONES);
            exec.report_progress(percent, format!("Прогресс: {percent:.0}%"))
                .await;
        }

        Ok(StepOutput::new(
            format!("Подготовлено {data_size} записей ({processing_type})"),
            StepResult::new()
                .with("data_size", data_size)
                .with("processing_type", processing_type)
                .with("status", "prepared"),
        ))
    }
}

/// Step 2: asks for a quality factor and processes the prepared records
#[derive(Debug)]
pub struct DataProcessing {
    workload: Arc<dyn Workload>,
}

impl DataProcessing {
    const MILESTONES: usize = 4;
    const MILESTONE_DELAY: Duration = Duration::from_millis(1500);

    pub fn new(workload: Arc<dyn Workload>) -> Self {
        Self { workload }
    }
}

#[async_trait]
impl PipelineStep for DataProcessing {
    fn name(&self) -> &str {
        DATA_PROCESSING
    }

    async fn execute(&self, exec: &mut StepExecution, input: &StepResult) -> Result<StepOutput> {
        let data_size = input.get_u64_or("data_size", 0);

        let request = exec.number_request(
            format!("Укажите коэффициент качества обработки ({QUALITY_MIN}-{QUALITY_MAX})"),
            QUALITY_MIN,
            QUALITY_MAX,
        );
        let quality_factor = exec
            .request_input(request)
            .await?
            .as_f64()
            .unwrap_or(QUALITY_MAX);

        for i in 1..=Self::MILESTONES {
            self.workload.pause(Self::MILESTONE_DELAY).await;
            let percent = milestone_percent(i, Self::MILESTONES);
            exec.report_progress(percent, format!("Обработано {percent:.0}% данных"))
                .await;
        }

        let yield_factor = self.workload.uniform(0.9, 1.0);
        let processed = (data_size as f64 * quality_factor * yield_factor).floor().max(0.0) as u64;

        Ok(StepOutput::new(
            format!("Обработано {processed} из {data_size} записей"),
            StepResult::new()
                .with("processed", processed)
                .with("original", data_size)
                .with("quality_factor", quality_factor)
                .with("status", "processed"),
        ))
    }
}

/// Step 3: asks for an analysis method and looks for insights
#[derive(Debug)]
pub struct DataAnalysis {
    workload: Arc<dyn Workload>,
}

impl DataAnalysis {
    const STAGES: [&'static str; 3] = ["Статистический анализ", "Поиск паттернов", "Генерация отчета"];
    const STAGE_DELAY: Duration = Duration::from_secs(2);

    pub fn new(workload: Arc<dyn Workload>) -> Self {
        Self { workload }
    }
}

#[async_trait]
impl PipelineStep for DataAnalysis {
    fn name(&self) -> &str {
        DATA_ANALYSIS
    }

    async fn execute(&self, exec: &mut StepExecution, input: &StepResult) -> Result<StepOutput> {
        let processed = input.get_u64_or("processed", 0);

        let request = exec.select_request("Выберите метод анализа", &ANALYSIS_METHODS);
        let analysis_method = exec.request_input(request).await?.as_text();

        for (i, stage) in Self::STAGES.iter().enumerate() {
            self.workload.pause(Self::STAGE_DELAY).await;
            exec.report_progress(
                milestone_percent(i + 1, Self::STAGES.len()),
                format!("Выполняется: {stage}"),
            )
            .await;
        }

        let insights = self.workload.int_range(5, 15);
        let anomalies = self.workload.int_range(0, 3);

        Ok(StepOutput::new(
            format!(
                "Найдено {insights} инсайтов и {anomalies} аномалий в {processed} записях ({analysis_method})"
            ),
            StepResult::new()
                .with("insights", insights)
                .with("anomalies", anomalies)
                .with("processed", processed)
                .with("analysis_method", analysis_method),
        ))
    }
}

/// Step 4: asks for the report shape and assembles the final artifact
#[derive(Debug)]
pub struct ReportGeneration {
    workload: Arc<dyn Workload>,
}

impl ReportGeneration {
    const CHART_STAGE: &'static str = "Создание графиков";
    const TEXT_STAGES: [&'static str; 2] = ["Формирование таблиц", "Финализация отчета"];
    const STAGE_DELAY: Duration = Duration::from_secs(1);

    pub fn new(workload: Arc<dyn Workload>) -> Self {
        Self { workload }
    }
}

#[async_trait]
impl PipelineStep for ReportGeneration {
    fn name(&self) -> &str {
        REPORT_GENERATION
    }

    async fn execute(&self, exec: &mut StepExecution, input: &StepResult) -> Result<StepOutput> {
        let insights = input.get_u64_or("insights", 0);
        let anomalies = input.get_u64_or("anomalies", 0);
        let processed = input.get_u64_or("processed", 0);
        let analysis_method = input.get_str_or("analysis_method", ANALYSIS_METHODS[0]);

        let request = exec.select_request("Выберите формат отчета", &REPORT_FORMATS);
        let report_format = exec.request_input(request).await?.as_text();
        let request = exec.select_request("Включить графики в отчет?", &CHART_OPTIONS);
        let includes_charts = exec.request_input(request).await?.as_text() == CHART_OPTIONS[0];

        let mut stages = Vec::with_capacity(3);
        if includes_charts {
            stages.push(Self::CHART_STAGE);
        }
        stages.extend(Self::TEXT_STAGES);

        for (i, stage) in stages.iter().enumerate() {
            self.workload.pause(Self::STAGE_DELAY).await;
            exec.report_progress(milestone_percent(i + 1, stages.len()), format!("{stage}..."))
                .await;
        }

        let report_id = format!("RPT-{}", self.workload.int_range(1000, 9999));

        Ok(StepOutput::new(
            format!("Отчет {report_id} успешно создан"),
            StepResult::new()
                .with("report_id", report_id)
                .with("total_records", processed)
                .with("insights_found", insights)
                .with("anomalies_detected", anomalies)
                .with("analysis_method", analysis_method)
                .with("report_format", report_format)
                .with("includes_charts", includes_charts)
                .with("completion_time", self.workload.now().to_rfc3339()),
        ))
    }
}
