use clap::ValueEnum;
use commerce_operations::workflows::WorkflowKind;

pub(super) fn render() -> String {
    let mut output = String::new();
    for kind in WorkflowKind::value_variants() {
        let help = kind
            .to_possible_value()
            .and_then(|value| value.get_help().map(ToString::to_string))
            .unwrap_or_default();
        output.push_str(&format!("{:<24}{help}\n", kind.name()));
    }
    output
}
