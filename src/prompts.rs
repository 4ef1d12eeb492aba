//! Prompt templates for the three generation passes.
//!
//! The templates are Portuguese text assets shared with the evaluation
//! datasets; they are embedded verbatim and must stay byte-stable. Variables
//! use `{name}` placeholders filled by [`render`]; literal braces elsewhere
//! (the N3 JSON example) pass through untouched.

/// Decompose a normative text into atomic RASE N1 sentences, one per line.
pub const N1_TEMPLATE: &str = "
Voce e um reescritor. Transforme o texto em sentencas RASE N1.

Regras:
1) Quebre em sentencas curtas e diretas.
2) Cada sentenca deve ter uma unica regra computavel.
3) Nao invente elementos (aplicabilidade, selecao, requisito, excecao). Preserve apenas o que existir.
4) Nao adicione explicacoes, titulos, bullets, numeracao ou o texto original.
5) Saida: apenas as sentencas, uma por linha, terminadas com ponto final.

Exemplo:
Entrada:
A inclinacao transversal da superficie deve ser de ate 2 % para pisos internos e de ate 3 % para pisos externos.
Saida:
Pisos internos devem ter inclinacao transversal de no maximo 2%.
Pisos externos devem ter inclinacao transversal de no maximo 3%.

TEXTO_INICIO
{text}
TEXTO_FIM
";

/// Extract the four labeled N2 clauses from one atomic sentence.
pub const N2_TEMPLATE: &str = "
Extrator RASE N2.
Use APENAS o Texto N1 para extrair os elementos. O Texto completo e apenas referencia.

Regras (ordem fixa):
1) aplicabilidade (opcional): onde/quando se aplica, sem verbos.
2) selecao (opcional): subconjunto da aplicabilidade, sem verbos.
3) execao (opcional): casos que NAO seguem a regra.
4) requisito (obrigatorio): acao/condicao principal, comeca com verbo.

Regras de saida:
- Retorne exatamente 4 linhas no formato abaixo.
- Cada campo deve aparecer no maximo uma vez.
- Se nao existir, use \"\" (string vazia).
- Nao adicione explicacoes, listas ou texto extra.

Exemplo (formato):
Texto completo:
\"As areas ... Norma.\"
Texto N1:
\"As areas de qualquer espaco ou edificacao de uso publico ou coletivo devem ser servidas de uma ou mais rotas acessiveis.\"
Resposta (4 linhas):
aplicabilidade: As areas de qualquer espaco ou edificacao
selecao: uso publico ou coletivo
execao: \"\"
requisito: devem ser servidas de uma ou mais rotas acessiveis

Agora processe:
Texto completo:
\"{text}\"
Texto N1:
\"{text_n1}\"

Resposta (4 linhas):
aplicabilidade:
selecao:
execao:
requisito:
";

/// Extract the typed comparison properties of one N2 clause as JSON.
pub const N3_TEMPLATE: &str = "
Extrator RASE N3.
Use APENAS o Texto N2 para extrair as propriedades. O Texto N1 e apenas referencia.

Regras:
1) type: categoria da regra (dimensao, quantidade, condicao ou existencia).
2) object: o elemento regulado.
3) property: a propriedade do objeto que a regra restringe.
4) comparation: o comparador (igual, minimo, maximo, entre).
5) target: o valor alvo, apenas o numero ou termo.
6) unit: a unidade de medida, se existir.

Regras de saida:
- Retorne um unico objeto JSON com exatamente estas 6 chaves.
- Se nao existir, use \"\" (string vazia).
- Nao adicione explicacoes ou texto extra.

Exemplo (formato):
Texto N2:
\"devem ter inclinacao transversal de no maximo 2%\"
Resposta (JSON):
{\"type\": \"dimensao\", \"object\": \"piso\", \"property\": \"inclinacao transversal\", \"comparation\": \"maximo\", \"target\": \"2\", \"unit\": \"%\"}

Agora processe:
Texto N1:
\"{text_n1}\"
Texto N2:
\"{text_n2}\"

Resposta (JSON):
";

/// Fill `{name}` placeholders in a template.
///
/// Only the provided variables are substituted; any other braced text in the
/// template is left alone.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}
