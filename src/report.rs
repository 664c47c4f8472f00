use crate::runner::Measurement;

pub const HEADER: &str = "Algorithm\tsekund/blok\tbajtów/sekundę(RAM)\tbajtów/sekundę(HDD)";

pub const ERROR_MARKER: &str = "ERROR";

pub fn format_row(measurement: &Measurement) -> String {
    format!(
        "{}\t{:.6}\t{:.6}\t{:.6}",
        measurement.name,
        measurement.seconds_per_block(),
        measurement.bytes_per_second_ram(),
        measurement.bytes_per_second_hdd()
    )
}

pub fn format_error_row(name: &str) -> String {
    format!("{0}\t{1}\t{1}\t{1}", name, ERROR_MARKER)
}
