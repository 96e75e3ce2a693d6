use raspadinha_core::{Affordance, Money};
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub(crate) struct ActionButtonProps {
    pub affordance: Affordance,
    pub enabled: bool,
    pub price: Money,
    #[prop_or_default]
    pub shortfall: Money,
    pub onclick: Callback<()>,
}

pub(crate) fn label(affordance: Affordance, price: Money) -> String {
    match affordance {
        Affordance::Play => format!("Comprar e raspar ({price})"),
        Affordance::RevealAll => "Revelar tudo".to_string(),
        Affordance::Wait => "Aguarde...".to_string(),
        Affordance::PlayAgain => format!("Jogar novamente ({price})"),
        Affordance::AddBalance => "Adicionar saldo".to_string(),
        Affordance::SignIn => "Entre para jogar".to_string(),
    }
}

fn class_name(affordance: Affordance) -> &'static str {
    match affordance {
        Affordance::Play | Affordance::PlayAgain => "play",
        Affordance::RevealAll => "reveal",
        Affordance::Wait => "wait",
        Affordance::AddBalance => "deposit",
        Affordance::SignIn => "sign-in",
    }
}

/// The single primary control of the scratch dialog.
#[function_component]
pub(crate) fn ActionButton(props: &ActionButtonProps) -> Html {
    let onclick = {
        let onclick = props.onclick.clone();
        Callback::from(move |_: MouseEvent| onclick.emit(()))
    };
    let hint = (props.affordance == Affordance::AddBalance && props.shortfall.is_positive())
        .then(|| html! { <small class="shortfall">{format!("Faltam {}", props.shortfall)}</small> });

    html! {
        <div class="action">
            <button
                class={classes!("primary", class_name(props.affordance))}
                disabled={!props.enabled}
                aria-busy={(props.affordance == Affordance::Wait).to_string()}
                {onclick}
            >
                {label(props.affordance, props.price)}
            </button>
            {hint}
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_affordance() {
        let price = Money::from_cents(1000);

        assert_eq!(label(Affordance::Play, price), "Comprar e raspar (R$ 10,00)");
        assert_eq!(label(Affordance::RevealAll, price), "Revelar tudo");
        assert_eq!(label(Affordance::PlayAgain, price), "Jogar novamente (R$ 10,00)");
        assert_eq!(label(Affordance::SignIn, price), "Entre para jogar");
    }
}
